use crate::error::{Error, Result};
use crate::token::Token;

/// A single address operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleAddress {
    /// `#n` — a character offset counted from the starting position.
    CharacterNumber(u64),
    /// `.` — the current selection.
    Dot,
    /// `$` — the end of the buffer.
    EndOfFile,
    /// `n` — a line, counted from the starting position.
    LineNumber(u64),
    /// `/pattern/` — the next (or, in reverse mode, previous) match.
    Regex(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Comma,
}

/// Simple addresses joined by `+`/`-`. The resolver rejects anything but
/// one or two operands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressTerm {
    pub operands: Vec<SimpleAddress>,
    pub ops: Vec<TermOp>,
}

impl AddressTerm {
    pub fn single(operand: SimpleAddress) -> Self {
        AddressTerm {
            operands: vec![operand],
            ops: Vec::new(),
        }
    }
}

/// Address terms joined by `,`: the low bound of the left operand through
/// the high bound of the right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressRange {
    pub operands: Vec<AddressTerm>,
    pub ops: Vec<RangeOp>,
}

impl AddressRange {
    pub fn single(term: AddressTerm) -> Self {
        AddressRange {
            operands: vec![term],
            ops: Vec::new(),
        }
    }
}

/// Every operation the command language knows. Commands act on the active
/// file's dot; only move/copy carry an address of their own (the
/// destination).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `a/text/` — insert after dot.
    Append(String),
    /// `c/text/` — replace dot.
    Change(String),
    /// `i/text/` — insert before dot.
    Insert(String),
    /// `d` — erase dot.
    Delete,
    /// `s/pattern/text/` — replace the first match inside dot.
    Substitute { pattern: String, replacement: String },
    /// `m addr` — move dot's text to the destination.
    Move(AddressRange),
    /// `t addr` — copy dot's text to the destination.
    Copy(AddressRange),
    /// `p` — print dot's text.
    Print,
    /// `=` — print dot's line numbers and offsets.
    PrintPosition,
    /// `q` — stop processing and signal quit.
    Quit,
    /// `u n` — undo up to n states.
    Undo(u64),
    /// `R n` — redo up to n states.
    Redo(u64),
    /// `l [filename]` — open a new file and make it active.
    OpenFile(Option<String>),
    /// `e filename` — replace the content with the file on disk.
    Edit(String),
    /// `r filename` — read the file over the selection.
    Read(String),
    /// `w filename` — write the content to disk.
    Write(String),
    /// `b n` — switch the active file.
    SetActiveFile(u64),
    /// `A` — re-encode the buffer as raw UTF-8 bytes.
    ToAscii,
    /// `U` — re-pack raw bytes as UTF-8 code points.
    ToUtf8,
    /// `g/pattern/cmd` — run cmd if the pattern matches inside dot.
    IfMatch { pattern: String, body: Box<Command> },
    /// `v/pattern/cmd` — run cmd if the pattern does not match inside dot.
    IfNoMatch { pattern: String, body: Box<Command> },
    /// `x/pattern/cmd` — run cmd once per match inside dot.
    ForEachMatch { pattern: String, body: Box<Command> },
    /// `!cmd` — run a child process, fire and forget.
    External(String),
    /// `>cmd` — run a child process, replace dot with its output.
    ExternalInput(String),
    /// `<cmd` — run a child process, feed it dot, discard output.
    ExternalOutput(String),
    /// `|cmd` — feed dot to a child process and replace dot with its output.
    ExternalIo(String),
}

/// A top-level unit of a command line: a bare address (moves dot only)
/// or a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Address(AddressRange),
    Command(Command),
}

/// Parses a token stream into top-level expressions, applied left to right
/// by the executor.
pub fn parse(tokens: &[Token]) -> Result<Vec<Expression>> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut expressions = Vec::new();
    while !parser.done() {
        match parser.parse_address_range()? {
            Some(addr) => expressions.push(Expression::Address(addr)),
            None => expressions.push(Expression::Command(parser.parse_command()?)),
        }
    }
    Ok(expressions)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_slash(&mut self) -> Result<()> {
        match self.next() {
            Some(Token::Slash) => Ok(()),
            Some(_) => Err(Error::TokenExpected("/".into())),
            None => Err(Error::NoTokens),
        }
    }

    fn expect_text(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Text(text)) => Ok(text.clone()),
            Some(_) => Err(Error::TokenExpected("text".into())),
            None => Err(Error::NoTokens),
        }
    }

    fn expect_number(&mut self) -> Result<u64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(*n),
            Some(_) => Err(Error::TokenExpected("number".into())),
            None => Err(Error::NoTokens),
        }
    }

    fn expect_filename(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Filename(name)) => Ok(name.clone()),
            Some(_) => Err(Error::TokenExpected("filename".into())),
            None => Err(Error::NoTokens),
        }
    }

    fn optional_number(&mut self, default: u64) -> u64 {
        match self.peek() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                *n
            }
            _ => default,
        }
    }

    /// `/text/` with both delimiters.
    fn parse_payload(&mut self) -> Result<String> {
        self.expect_slash()?;
        let text = self.expect_text()?;
        self.expect_slash()?;
        Ok(text)
    }

    fn parse_simple_address(&mut self) -> Result<Option<SimpleAddress>> {
        match self.peek() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Some(SimpleAddress::LineNumber(*n)))
            }
            Some(Token::Hashtag) => {
                self.pos += 1;
                let n = self.expect_number()?;
                Ok(Some(SimpleAddress::CharacterNumber(n)))
            }
            Some(Token::Dot) => {
                self.pos += 1;
                Ok(Some(SimpleAddress::Dot))
            }
            Some(Token::Dollar) => {
                self.pos += 1;
                Ok(Some(SimpleAddress::EndOfFile))
            }
            Some(Token::Slash) => {
                self.pos += 1;
                let pattern = self.expect_text()?;
                self.expect_slash()?;
                Ok(Some(SimpleAddress::Regex(pattern)))
            }
            _ => Ok(None),
        }
    }

    /// Returns `None` when no address material is present at all. A missing
    /// operand next to `+`/`-` elides to dot.
    fn parse_address_term(&mut self) -> Result<Option<AddressTerm>> {
        let first = self.parse_simple_address()?;
        let op = match self.peek() {
            Some(Token::Plus) => Some(TermOp::Plus),
            Some(Token::Minus) => Some(TermOp::Minus),
            _ => None,
        };
        if first.is_none() && op.is_none() {
            return Ok(None);
        }
        let mut term = AddressTerm::single(first.unwrap_or(SimpleAddress::Dot));
        if let Some(op) = op {
            self.pos += 1;
            let second = self.parse_simple_address()?.unwrap_or(SimpleAddress::Dot);
            term.ops.push(op);
            term.operands.push(second);
        }
        Ok(Some(term))
    }

    /// A comma with elided operands defaults to character 0 on the left and
    /// end-of-file on the right, so a lone `,` spans the whole buffer.
    fn parse_address_range(&mut self) -> Result<Option<AddressRange>> {
        let left = self.parse_address_term()?;
        if !matches!(self.peek(), Some(Token::Comma)) {
            return Ok(left.map(AddressRange::single));
        }
        self.pos += 1;
        let right = self.parse_address_term()?;
        Ok(Some(AddressRange {
            operands: vec![
                left.unwrap_or_else(|| AddressTerm::single(SimpleAddress::CharacterNumber(0))),
                right.unwrap_or_else(|| AddressTerm::single(SimpleAddress::EndOfFile)),
            ],
            ops: vec![RangeOp::Comma],
        }))
    }

    fn require_address(&mut self) -> Result<AddressRange> {
        self.parse_address_range()?.ok_or(Error::AddressExpected)
    }

    /// The sub-command of `g`/`v`/`x` must be a command, never a bare
    /// address.
    fn parse_sub_command(&mut self) -> Result<Command> {
        match self.peek() {
            Some(Token::Command(_) | Token::External(_, _)) => self.parse_command(),
            Some(_) => Err(Error::CommandExpected),
            None => Err(Error::NoTokens),
        }
    }

    fn parse_command(&mut self) -> Result<Command> {
        match self.next() {
            None => Err(Error::NoTokens),
            Some(Token::Command(letter)) => match letter {
                'a' => Ok(Command::Append(self.parse_payload()?)),
                'c' => Ok(Command::Change(self.parse_payload()?)),
                'i' => Ok(Command::Insert(self.parse_payload()?)),
                'd' => Ok(Command::Delete),
                's' => {
                    self.expect_slash()?;
                    let pattern = self.expect_text()?;
                    self.expect_slash()?;
                    let replacement = self.expect_text()?;
                    self.expect_slash()?;
                    Ok(Command::Substitute {
                        pattern,
                        replacement,
                    })
                }
                'm' => Ok(Command::Move(self.require_address()?)),
                't' => Ok(Command::Copy(self.require_address()?)),
                'p' => Ok(Command::Print),
                '=' => Ok(Command::PrintPosition),
                'q' => Ok(Command::Quit),
                'u' => Ok(Command::Undo(self.optional_number(1))),
                'R' => Ok(Command::Redo(self.optional_number(1))),
                'b' => Ok(Command::SetActiveFile(self.expect_number()?)),
                'e' => Ok(Command::Edit(self.expect_filename()?)),
                'r' => Ok(Command::Read(self.expect_filename()?)),
                'w' => Ok(Command::Write(self.expect_filename()?)),
                'l' => match self.peek() {
                    Some(Token::Filename(name)) => {
                        let name = name.clone();
                        self.pos += 1;
                        Ok(Command::OpenFile(Some(name)))
                    }
                    _ => Ok(Command::OpenFile(None)),
                },
                'A' => Ok(Command::ToAscii),
                'U' => Ok(Command::ToUtf8),
                'g' => {
                    let pattern = self.parse_payload()?;
                    let body = Box::new(self.parse_sub_command()?);
                    Ok(Command::IfMatch { pattern, body })
                }
                'v' => {
                    let pattern = self.parse_payload()?;
                    let body = Box::new(self.parse_sub_command()?);
                    Ok(Command::IfNoMatch { pattern, body })
                }
                'x' => {
                    let pattern = self.parse_payload()?;
                    let body = Box::new(self.parse_sub_command()?);
                    Ok(Command::ForEachMatch { pattern, body })
                }
                other => Err(Error::NotImplemented(other.to_string())),
            },
            Some(Token::External(marker, cmdline)) => {
                let cmdline = cmdline.clone();
                match marker {
                    '!' => Ok(Command::External(cmdline)),
                    '>' => Ok(Command::ExternalInput(cmdline)),
                    '<' => Ok(Command::ExternalOutput(cmdline)),
                    '|' => Ok(Command::ExternalIo(cmdline)),
                    _ => Err(Error::BadSyntax),
                }
            }
            Some(Token::Bad(_)) => Err(Error::BadSyntax),
            Some(_) => Err(Error::CommandExpected),
        }
    }
}
