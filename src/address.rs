use regex::Regex;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::parse::{AddressRange, AddressTerm, RangeOp, SimpleAddress, TermOp};
use crate::types::{Address, File, Range};

/// Resolves a full address range against a file and its current dot.
///
/// Comma composition takes the low bound of the left term and the high
/// bound of the right term.
pub fn resolve_range(addr: &AddressRange, file: &File) -> Result<Address> {
    if addr.operands.is_empty() || addr.operands.len() > 2 {
        return Err(Error::InvalidAddress);
    }
    let mut out = resolve_term(&addr.operands[0], file)?;
    if addr.operands.len() == 2 {
        let right = resolve_term(&addr.operands[1], file)?;
        match addr.ops[0] {
            RangeOp::Comma => out.range.p2 = right.range.p2,
        }
        if out.range.p2 < out.range.p1 {
            std::mem::swap(&mut out.range.p1, &mut out.range.p2);
        }
    }
    Ok(out)
}

/// Resolves one address term. A composed term resolves to the second
/// operand's range; the first operand only supplies the starting position
/// (`+` chains forward from its high bound, `-` switches to reverse mode
/// from its low bound).
pub fn resolve_term(term: &AddressTerm, file: &File) -> Result<Address> {
    if term.operands.is_empty() || term.operands.len() > 2 {
        return Err(Error::InvalidAddress);
    }
    let first = resolve_simple(&term.operands[0], 0, false, file)?;
    let range = if term.operands.len() == 2 {
        match term.ops[0] {
            TermOp::Plus => resolve_simple(&term.operands[1], first.p2 as i64, false, file)?,
            TermOp::Minus => resolve_simple(&term.operands[1], first.p1 as i64, true, file)?,
        }
    } else {
        first
    };
    Ok(Address {
        range,
        file_id: file.file_id,
    })
}

fn resolve_simple(
    simple: &SimpleAddress,
    starting_pos: i64,
    reverse: bool,
    file: &File,
) -> Result<Range> {
    let len = file.content.len();
    match simple {
        SimpleAddress::CharacterNumber(n) => {
            let p = if reverse {
                starting_pos - *n as i64
            } else {
                starting_pos + *n as i64
            };
            Ok(clamped(p, p, len))
        }
        SimpleAddress::Dot => {
            let dot = file.dot.range;
            let (p1, p2) = if reverse {
                (starting_pos - dot.p1 as i64, starting_pos - dot.p2 as i64)
            } else {
                (dot.p1 as i64 + starting_pos, dot.p2 as i64 + starting_pos)
            };
            Ok(clamped(p1, p2, len))
        }
        SimpleAddress::EndOfFile => Ok(Range::new(len, len)),
        SimpleAddress::LineNumber(n) => Ok(resolve_line(*n, starting_pos, reverse, file)),
        SimpleAddress::Regex(pattern) => regex_range(pattern, &file.content, reverse, starting_pos),
    }
}

/// Normalizes p1 <= p2 and clamps both into `[0, len]`.
fn clamped(p1: i64, p2: i64, len: usize) -> Range {
    let (lo, hi) = if p2 < p1 { (p2, p1) } else { (p1, p2) };
    Range::new(
        lo.clamp(0, len as i64) as usize,
        hi.clamp(0, len as i64) as usize,
    )
}

/// Line addressing counts newline crossings from the starting position.
///
/// Forward: line 1 runs from `starting_pos` to just past the first newline;
/// crossing the (n-1)th newline pins p1, crossing the nth pins p2. When the
/// scan runs out the missing bound defaults to the buffer end. Reverse
/// mirrors the scan backwards with defaults at 0/starting_pos, after first
/// pulling the starting position back past the previous newline.
fn resolve_line(n: u64, mut starting_pos: i64, reverse: bool, file: &File) -> Range {
    let len = file.content.len();
    if starting_pos != 0 && reverse {
        starting_pos = previous_end_of_line(starting_pos, &file.content);
    }
    if n == 0 {
        return clamped(starting_pos, starting_pos, len);
    }
    let start = starting_pos.clamp(0, len as i64) as usize;
    if reverse {
        let mut p1: i64 = 0;
        let mut p2: i64 = starting_pos;
        let mut current_line: u64 = 1;
        let mut position = starting_pos;
        let mut iter = file.content.chars_before(start);
        while let Some(ch) = iter.next() {
            if ch == '\n' {
                current_line += 1;
                if current_line == n {
                    p2 = position - 1;
                }
                if current_line > n {
                    p1 = position;
                    return clamped(p1, p2, len);
                }
            }
            position -= 1;
        }
        clamped(p1, p2, len)
    } else {
        let mut p1: i64 = starting_pos;
        let mut p2: i64 = len as i64;
        let mut current_line: u64 = 1;
        let mut position = starting_pos;
        for ch in file.content.chars_at(start) {
            if ch == '\n' {
                current_line += 1;
                if current_line == n {
                    p1 = position + 1;
                }
                if current_line > n {
                    p2 = position + 1;
                    return clamped(p1, p2, len);
                }
            }
            position += 1;
        }
        clamped(p1, p2, len)
    }
}

/// Position just before the previous newline, or 0 when there is none.
fn previous_end_of_line(pos: i64, content: &Buffer) -> i64 {
    let start = pos.clamp(0, content.len() as i64) as usize;
    let mut position = pos;
    let mut iter = content.chars_before(start);
    while let Some(ch) = iter.next() {
        if ch == '\n' {
            return position - 1;
        }
        position -= 1;
    }
    0
}

/// Finds the match range for `pattern`: forward, the first match at or
/// after `starting_pos` (no match yields `[len, len]`); in reverse, the
/// last match strictly before `starting_pos` (no match yields `[0, 0]`).
pub fn regex_range(
    pattern: &str,
    content: &Buffer,
    reverse: bool,
    starting_pos: i64,
) -> Result<Range> {
    let re = compile(pattern)?;
    let len = content.len();
    let start = starting_pos.clamp(0, len as i64) as usize;
    if reverse {
        let hay = content.slice_string(0, start);
        match re.find_iter(&hay).last() {
            Some(m) => Ok(char_range(&hay, m.start(), m.end(), 0)),
            None => Ok(Range::new(0, 0)),
        }
    } else {
        let hay = content.slice_string(start, len);
        match re.find(&hay) {
            Some(m) => Ok(char_range(&hay, m.start(), m.end(), start)),
            None => Ok(Range::new(len, len)),
        }
    }
}

pub fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidRegex(e.to_string()))
}

/// Translates byte offsets within `hay` into absolute character positions.
fn char_range(hay: &str, byte_start: usize, byte_end: usize, base: usize) -> Range {
    let p1 = base + hay[..byte_start].chars().count();
    let p2 = p1 + hay[byte_start..byte_end].chars().count();
    Range::new(p1, p2)
}

/// 1-based line number of the character position `pos`, counting newlines
/// strictly before it.
pub fn line_number_at(content: &Buffer, pos: usize) -> u64 {
    let mut line = 1;
    for (index, ch) in content.chars().enumerate() {
        if index == pos {
            return line;
        }
        if ch == '\n' {
            line += 1;
        }
    }
    line
}
