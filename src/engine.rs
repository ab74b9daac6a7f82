use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::address::{self, resolve_range};
use crate::buffer::Buffer;
use crate::encoding::{self, Encoding};
use crate::error::Result;
use crate::parse::{self, Command, Expression};
use crate::pipe;
use crate::token::tokenize;
use crate::types::{EngineState, File, ModificationFlags, Range, Snapshot};

/// Grace period before a piped child process is killed.
const DESTROY_GRACE: Duration = Duration::from_millis(10);

/// Opens each path as a file; missing files still register as empty files
/// under that name. With no paths, a single unnamed empty file is created.
pub fn init_state(paths: &[&str]) -> EngineState {
    let mut files = Vec::new();
    for path in paths {
        let file_id = files.len() as u64;
        files.push(read_file(path, file_id));
    }
    if files.is_empty() {
        files.push(File::empty(0));
    }
    EngineState {
        files,
        active_file: 0,
    }
}

/// Interprets one command line against `state`, printing to stdout.
///
/// Returns `Ok(None)` when the quit command ran. On error the caller keeps
/// the state it passed in; execution up to the failing expression is
/// discarded.
pub fn handle_command(state: EngineState, command: &str) -> Result<Option<EngineState>> {
    let mut stdout = std::io::stdout();
    handle_command_with_output(state, command, &mut stdout)
}

/// Like [`handle_command`] but with an explicit sink for the print
/// commands (`p`, `=`). Output is always UTF-8.
pub fn handle_command_with_output(
    state: EngineState,
    command: &str,
    out: &mut dyn Write,
) -> Result<Option<EngineState>> {
    let tokens = tokenize(command);
    let expressions = parse::parse(&tokens)?;
    trace!(expressions = expressions.len(), "parsed command line");
    let mut executor = Executor {
        state,
        save_undo: true,
        out,
    };
    for expression in &expressions {
        match executor.run_expression(expression)? {
            Flow::Continue => {}
            Flow::Quit => return Ok(None),
        }
    }
    Ok(Some(executor.state))
}

fn read_file(filename: &str, file_id: u64) -> File {
    let mut file = File::empty(file_id);
    file.filename = filename.to_string();
    let mut enc = file.encoding;
    file.content = read_buffer_from_disk(filename, &mut enc);
    file.encoding = enc;
    file.dot.range = Range::new(0, file.content.len());
    file
}

/// Reads and decodes a file. A file that is not valid UTF-8 permanently
/// downgrades `enc` to ASCII (bytes become characters 0..=255).
fn read_buffer_from_disk(filename: &str, enc: &mut Encoding) -> Buffer {
    match fs::read(filename) {
        Ok(bytes) => {
            if *enc == Encoding::Utf8 && !encoding::is_valid_utf8(&bytes) {
                *enc = Encoding::Ascii;
            }
            debug!(filename, ?enc, bytes = bytes.len(), "read file");
            Buffer::from_text(&encoding::decode(&bytes, *enc))
        }
        Err(_) => Buffer::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Executes parsed expressions against an owned state.
///
/// `save_undo` implements undo suppression for compound commands: while a
/// `g`/`v`/`x` body runs, inner edits skip their snapshot push and exactly
/// one outer snapshot (taken before the compound) is recorded at the end.
struct Executor<'a> {
    state: EngineState,
    save_undo: bool,
    out: &'a mut dyn Write,
}

impl Executor<'_> {
    fn run_expression(&mut self, expression: &Expression) -> Result<Flow> {
        match expression {
            Expression::Address(addr) => {
                let resolved = resolve_range(addr, self.state.active())?;
                self.state.active_mut().dot = resolved;
                Ok(Flow::Continue)
            }
            Expression::Command(cmd) => self.run_command(cmd),
        }
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        if self.save_undo {
            let file = self.state.active_mut();
            file.history.push(snapshot);
            file.undo_redo_index = file.history.len();
        }
    }

    fn run_command(&mut self, cmd: &Command) -> Result<Flow> {
        trace!(command = ?cmd, "execute");
        match cmd {
            Command::Append(text) => {
                let file = self.state.active();
                let snapshot = file.snapshot();
                let dot = file.dot.range;
                let added = text.chars().count();
                let file = self.state.active_mut();
                file.content = file.content.insert(dot.p2, text);
                file.dot.range = Range::new(dot.p2, dot.p2 + added);
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Change(text) => {
                let file = self.state.active();
                let snapshot = file.snapshot();
                let dot = file.dot.range;
                let added = text.chars().count();
                let file = self.state.active_mut();
                file.content = file.content.erase(dot.p1, dot.p2).insert(dot.p1, text);
                file.dot.range = Range::new(dot.p1, dot.p1 + added);
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Insert(text) => {
                let file = self.state.active();
                let snapshot = file.snapshot();
                let dot = file.dot.range;
                let added = text.chars().count();
                let file = self.state.active_mut();
                file.content = file.content.insert(dot.p1, text);
                file.dot.range = Range::new(dot.p1, dot.p1 + added);
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Delete => {
                let file = self.state.active();
                let snapshot = file.snapshot();
                let dot = file.dot.range;
                let file = self.state.active_mut();
                file.content = file.content.erase(dot.p1, dot.p2);
                file.dot.range = Range::new(dot.p1, dot.p1);
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Substitute {
                pattern,
                replacement,
            } => {
                let re = address::compile(pattern)?;
                let file = self.state.active();
                let dot = file.dot.range;
                let hay = file.content.slice_string(dot.p1, dot.p2);
                // No match inside dot is a silent no-op, no snapshot.
                let Some(m) = re.find(&hay) else {
                    return Ok(Flow::Continue);
                };
                let p1 = dot.p1 + hay[..m.start()].chars().count();
                let matched = hay[m.start()..m.end()].chars().count();
                let added = replacement.chars().count();
                let snapshot = file.snapshot();
                let file = self.state.active_mut();
                file.content = file
                    .content
                    .erase(p1, p1 + matched)
                    .insert(p1, replacement);
                file.dot.range = Range::new(p1, p1 + added);
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Move(addr) => {
                let file = self.state.active();
                let snapshot = file.snapshot();
                let dot = file.dot.range;
                let text = file.content.slice_string(dot.p1, dot.p2);
                let dest = resolve_range(addr, file)?.range;
                let src_len = dot.len();
                let file = self.state.active_mut();
                if dest.p2 >= dot.p2 {
                    // Insert first: the source offsets are unaffected by an
                    // insertion at or past the source's high bound.
                    file.content = file.content.insert(dest.p2, &text).erase(dot.p1, dot.p2);
                    file.dot.range = Range::new(dest.p2 - src_len, dest.p2);
                } else {
                    file.content = file.content.erase(dot.p1, dot.p2).insert(dest.p2, &text);
                    file.dot.range = Range::new(dest.p2, dest.p2 + src_len);
                }
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Copy(addr) => {
                let file = self.state.active();
                let snapshot = file.snapshot();
                let dot = file.dot.range;
                let text = file.content.slice_string(dot.p1, dot.p2);
                let dest = resolve_range(addr, file)?.range;
                let src_len = dot.len();
                let file = self.state.active_mut();
                file.content = file.content.insert(dest.p2, &text);
                file.dot.range = Range::new(dest.p2, dest.p2 + src_len);
                file.flags |= ModificationFlags::MODIFIED;
                self.push_undo(snapshot);
                Ok(Flow::Continue)
            }
            Command::Print => {
                let file = self.state.active();
                let dot = file.dot.range;
                let text = file.content.slice_string(dot.p1, dot.p2);
                let _ = writeln!(self.out, "{text}");
                Ok(Flow::Continue)
            }
            Command::PrintPosition => {
                let file = self.state.active();
                let dot = file.dot.range;
                let l1 = address::line_number_at(&file.content, dot.p1);
                let l2 = address::line_number_at(&file.content, dot.p2);
                let _ = writeln!(self.out, "{l1} {l2} {} {}", dot.p1, dot.p2);
                Ok(Flow::Continue)
            }
            Command::Quit => Ok(Flow::Quit),
            Command::Undo(n) => {
                if self.state.active().undo_redo_index == self.state.active().history.len() {
                    // First undo since the last edit: save the live state so
                    // the deepest point stays redoable.
                    let snapshot = self.state.active().snapshot();
                    self.push_undo(snapshot);
                    let file = self.state.active_mut();
                    file.undo_redo_index = file.undo_redo_index.saturating_sub(1);
                }
                let file = self.state.active_mut();
                for _ in 0..*n {
                    if file.undo_redo_index > 0 {
                        file.undo_redo_index -= 1;
                        let snapshot = file.history[file.undo_redo_index].clone();
                        file.restore(&snapshot);
                        file.history.push(snapshot);
                    }
                }
                Ok(Flow::Continue)
            }
            Command::Redo(n) => {
                let file = self.state.active_mut();
                for _ in 0..*n {
                    if file.undo_redo_index + 1 < file.history.len() {
                        file.undo_redo_index += 1;
                        let snapshot = file.history[file.undo_redo_index].clone();
                        file.restore(&snapshot);
                        file.history.push(snapshot);
                    }
                }
                Ok(Flow::Continue)
            }
            Command::SetActiveFile(n) => {
                if (*n as usize) < self.state.files.len() {
                    self.state.active_file = *n as usize;
                }
                Ok(Flow::Continue)
            }
            Command::OpenFile(filename) => {
                match filename {
                    None => {
                        let file_id = self.state.files.len() as u64;
                        self.state.files.push(File::empty(file_id));
                        self.state.active_file = file_id as usize;
                    }
                    Some(name) if Path::new(name).exists() => {
                        let file_id = self.state.files.len() as u64;
                        self.state.files.push(read_file(name, file_id));
                        self.state.active_file = file_id as usize;
                    }
                    Some(_) => {}
                }
                Ok(Flow::Continue)
            }
            Command::Edit(name) => {
                if Path::new(name).exists() {
                    let snapshot = self.state.active().snapshot();
                    let file = self.state.active_mut();
                    let mut enc = file.encoding;
                    let content = read_buffer_from_disk(name, &mut enc);
                    file.encoding = enc;
                    file.dot.range = Range::new(0, content.len());
                    file.content = content;
                    file.flags |= ModificationFlags::MODIFIED;
                    self.push_undo(snapshot);
                }
                Ok(Flow::Continue)
            }
            Command::Read(name) => {
                if Path::new(name).exists() {
                    let snapshot = self.state.active().snapshot();
                    let file = self.state.active_mut();
                    let mut enc = file.encoding;
                    let incoming = read_buffer_from_disk(name, &mut enc);
                    let added = incoming.len();
                    let dot = file.dot.range;
                    file.encoding = enc;
                    file.content = file
                        .content
                        .erase(dot.p1, dot.p2)
                        .insert(dot.p1, &incoming.to_string());
                    file.dot.range = Range::new(dot.p1, dot.p1 + added);
                    file.flags |= ModificationFlags::MODIFIED;
                    self.push_undo(snapshot);
                }
                Ok(Flow::Continue)
            }
            Command::Write(name) => {
                let file = self.state.active_mut();
                let bytes = encoding::encode(&file.content.to_string(), file.encoding);
                if fs::write(name, bytes).is_ok() {
                    debug!(filename = name, "wrote file");
                    file.flags = ModificationFlags::empty();
                    // Every undo point now corresponds to a saved state.
                    for snapshot in &mut file.history {
                        snapshot.flags = ModificationFlags::MODIFIED;
                    }
                }
                Ok(Flow::Continue)
            }
            Command::ToAscii => self.run_to_ascii(),
            Command::ToUtf8 => self.run_to_utf8(),
            Command::IfMatch { pattern, body } => self.run_conditional(pattern, body, true),
            Command::IfNoMatch { pattern, body } => self.run_conditional(pattern, body, false),
            Command::ForEachMatch { pattern, body } => self.run_for_each(pattern, body),
            Command::External(cmdline) => {
                pipe::run_detached(cmdline)?;
                Ok(Flow::Continue)
            }
            Command::ExternalOutput(cmdline) => {
                let mut handle = pipe::run(cmdline)?;
                let file = self.state.active();
                let dot = file.dot.range;
                let text = file.content.slice_string(dot.p1, dot.p2).replace('\r', "");
                pipe::write(&mut handle, &encoding::encode(&text, file.encoding))?;
                pipe::destroy(handle, DESTROY_GRACE);
                Ok(Flow::Continue)
            }
            Command::ExternalInput(cmdline) => {
                let mut handle = pipe::run(cmdline)?;
                let bytes = pipe::read(&mut handle, pipe::DEFAULT_READ_TIMEOUT);
                self.replace_dot_with_output(&bytes);
                pipe::destroy(handle, DESTROY_GRACE);
                Ok(Flow::Continue)
            }
            Command::ExternalIo(cmdline) => {
                let mut handle = pipe::run(cmdline)?;
                let file = self.state.active();
                let dot = file.dot.range;
                let text = file.content.slice_string(dot.p1, dot.p2).replace('\r', "");
                pipe::write(&mut handle, &encoding::encode(&text, file.encoding))?;
                let bytes = pipe::read(&mut handle, pipe::DEFAULT_READ_TIMEOUT);
                self.replace_dot_with_output(&bytes);
                pipe::destroy(handle, DESTROY_GRACE);
                Ok(Flow::Continue)
            }
        }
    }

    /// Replaces the selection with decoded child-process output.
    fn replace_dot_with_output(&mut self, bytes: &[u8]) {
        let file = self.state.active();
        let snapshot = file.snapshot();
        let text = encoding::decode(bytes, file.encoding).replace('\r', "");
        let added = text.chars().count();
        let dot = file.dot.range;
        let file = self.state.active_mut();
        file.content = file.content.erase(dot.p1, dot.p2).insert(dot.p1, &text);
        file.dot.range = Range::new(dot.p1, dot.p1 + added);
        file.flags |= ModificationFlags::MODIFIED;
        self.push_undo(snapshot);
    }

    /// `g` / `v`: run the body once when the pattern does (`want_match`)
    /// or does not match inside dot. One outer snapshot wraps the body.
    fn run_conditional(&mut self, pattern: &str, body: &Command, want_match: bool) -> Result<Flow> {
        let re = address::compile(pattern)?;
        let file = self.state.active();
        let snapshot = file.snapshot();
        let dot = file.dot.range;
        let hay = file.content.slice_string(dot.p1, dot.p2);
        let saved = self.save_undo;
        self.save_undo = false;
        let mut flow = Flow::Continue;
        if re.is_match(&hay) == want_match {
            flow = self.run_command(body)?;
        }
        self.save_undo = saved;
        if flow == Flow::Quit {
            return Ok(Flow::Quit);
        }
        self.push_undo(snapshot);
        Ok(Flow::Continue)
    }

    /// `x`: run the body once per non-overlapping match inside dot, with
    /// dot set to each match in turn. The end of the search window is
    /// tracked as a distance from the buffer end so the body's edits shift
    /// it correctly; empty matches advance one extra position.
    fn run_for_each(&mut self, pattern: &str, body: &Command) -> Result<Flow> {
        let re = address::compile(pattern)?;
        let file = self.state.active();
        let snapshot = file.snapshot();
        let dot = file.dot.range;
        let mut cursor = dot.p1;
        let distance_to_end = file.content.len() - dot.p2;
        let saved = self.save_undo;
        self.save_undo = false;
        loop {
            let len = self.state.active().content.len();
            if distance_to_end > len {
                break;
            }
            let end = len - distance_to_end;
            if cursor >= end {
                break;
            }
            let hay = self.state.active().content.slice_string(cursor, end);
            let Some(m) = re.find(&hay) else {
                break;
            };
            let p1 = cursor + hay[..m.start()].chars().count();
            let p2 = p1 + hay[m.start()..m.end()].chars().count();
            let offset = if p1 == p2 { 1 } else { 0 };
            self.state.active_mut().dot.range = Range::new(p1, p2);
            let flow = self.run_command(body)?;
            if flow == Flow::Quit {
                self.save_undo = saved;
                return Ok(Flow::Quit);
            }
            cursor = self.state.active().dot.range.p2 + offset;
        }
        self.save_undo = saved;
        self.push_undo(snapshot);
        Ok(Flow::Continue)
    }

    fn run_to_ascii(&mut self) -> Result<Flow> {
        let file = self.state.active();
        if file.encoding == Encoding::Ascii {
            return Ok(Flow::Continue);
        }
        let snapshot = file.snapshot();
        let dot = file.dot.range;
        let mut encoded = String::new();
        let mut new_len = 0usize;
        let (mut p1, mut p2) = (0usize, 0usize);
        let mut pos = 0usize;
        let mut utf8 = [0u8; 4];
        for ch in file.content.chars() {
            if pos == dot.p1 {
                p1 = new_len;
            }
            if pos == dot.p2 {
                p2 = new_len;
            }
            for &b in ch.encode_utf8(&mut utf8).as_bytes() {
                encoded.push(b as char);
                new_len += 1;
            }
            pos += 1;
        }
        if pos == dot.p1 {
            p1 = new_len;
        }
        if pos == dot.p2 {
            p2 = new_len;
        }
        let file = self.state.active_mut();
        file.content = Buffer::from_text(&encoded);
        file.dot.range = Range::new(p1, p2);
        file.encoding = Encoding::Ascii;
        file.flags |= ModificationFlags::MODIFIED;
        self.push_undo(snapshot);
        Ok(Flow::Continue)
    }

    fn run_to_utf8(&mut self) -> Result<Flow> {
        let file = self.state.active();
        if file.encoding == Encoding::Utf8 {
            return Ok(Flow::Continue);
        }
        let snapshot = file.snapshot();
        let dot = file.dot.range;
        let mut bytes = Vec::with_capacity(file.content.len());
        for ch in file.content.chars() {
            let value = ch as u32;
            if value > 0xFF {
                // Not a byte-per-position buffer; nothing to re-pack.
                return Ok(Flow::Continue);
            }
            bytes.push(value as u8);
        }
        let Ok(decoded) = std::str::from_utf8(&bytes) else {
            return Ok(Flow::Continue);
        };
        let decoded = decoded.to_owned();
        let (mut p1, mut p2) = (0usize, 0usize);
        let mut consumed = 0usize;
        let mut produced = 0usize;
        for ch in decoded.chars() {
            let width = ch.len_utf8();
            if dot.p1 >= consumed && dot.p1 < consumed + width {
                p1 = produced;
            }
            if dot.p2 >= consumed && dot.p2 < consumed + width {
                p2 = produced;
            }
            consumed += width;
            produced += 1;
        }
        if dot.p1 == consumed {
            p1 = produced;
        }
        if dot.p2 == consumed {
            p2 = produced;
        }
        let file = self.state.active_mut();
        file.content = Buffer::from_text(&decoded);
        file.dot.range = Range::new(p1, p2);
        file.encoding = Encoding::Utf8;
        file.flags |= ModificationFlags::MODIFIED;
        self.push_undo(snapshot);
        Ok(Flow::Continue)
    }
}
