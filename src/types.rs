use bitflags::bitflags;

use crate::buffer::Buffer;
use crate::encoding::Encoding;

bitflags! {
    /// Per-file modification state.
    ///
    /// On history snapshots the `MODIFIED` bit doubles as "this state has
    /// been saved to disk": `w` sets it on every snapshot so a surrounding
    /// UI can tell saved undo points from unsaved ones.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModificationFlags: u64 {
        const MODIFIED = 1;
    }
}

/// A half-open `[p1, p2)` span of character positions within a buffer.
///
/// Resolved ranges always satisfy `p1 <= p2 <= buffer.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub p1: usize,
    pub p2: usize,
}

impl Range {
    pub fn new(p1: usize, p2: usize) -> Self {
        Range { p1, p2 }
    }

    pub fn len(&self) -> usize {
        self.p2.saturating_sub(self.p1)
    }

    pub fn is_empty(&self) -> bool {
        self.p2 <= self.p1
    }
}

/// A resolved range tied to the file it was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Address {
    pub range: Range,
    pub file_id: u64,
}

/// A full immutable capture of one file state, kept for undo/redo.
///
/// Snapshots are created just before a mutating command commits and never
/// touched afterwards; the buffer inside shares storage with the live file.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub content: Buffer,
    pub dot: Address,
    pub flags: ModificationFlags,
    pub encoding: Encoding,
}

/// One open file: its content, selection, undo history and encoding.
///
/// `dot` is the current selection and the implicit address for commands
/// that carry none. `undo_redo_index` marks the history position the next
/// redo would restore; it is always within `0..=history.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub content: Buffer,
    pub filename: String,
    pub flags: ModificationFlags,
    pub file_id: u64,
    pub dot: Address,
    pub history: Vec<Snapshot>,
    pub undo_redo_index: usize,
    pub encoding: Encoding,
}

impl File {
    /// A fresh empty file with the given id, selection collapsed at 0.
    pub fn empty(file_id: u64) -> Self {
        File {
            content: Buffer::new(),
            filename: String::new(),
            flags: ModificationFlags::empty(),
            file_id,
            dot: Address {
                range: Range::default(),
                file_id,
            },
            history: Vec::new(),
            undo_redo_index: 0,
            encoding: Encoding::Utf8,
        }
    }

    /// A file seeded with `text`, dot spanning the whole content.
    pub fn from_text(file_id: u64, text: &str) -> Self {
        let content = Buffer::from_text(text);
        let len = content.len();
        File {
            dot: Address {
                range: Range::new(0, len),
                file_id,
            },
            content,
            ..File::empty(file_id)
        }
    }

    /// Captures the current state for the undo history.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            content: self.content.clone(),
            dot: self.dot,
            flags: self.flags,
            encoding: self.encoding,
        }
    }

    /// Restores a snapshot into the live file, leaving history untouched.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.content = snapshot.content.clone();
        self.dot = snapshot.dot;
        self.flags = snapshot.flags;
        self.encoding = snapshot.encoding;
    }
}

/// The unit of state threaded through command execution.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub files: Vec<File>,
    pub active_file: usize,
}

impl EngineState {
    pub fn active(&self) -> &File {
        &self.files[self.active_file]
    }

    pub fn active_mut(&mut self) -> &mut File {
        &mut self.files[self.active_file]
    }
}
