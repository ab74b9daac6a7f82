use ropey::Rope;
use ropey::iter::Chars;

/// An immutable sequence of characters with structural sharing.
///
/// Every edit returns a new `Buffer`; cloning is O(1) and two buffers that
/// differ by one edit share all unchanged chunks. This is what makes the
/// undo history affordable: each snapshot keeps a full `Buffer`, but the
/// storage cost is only the edited region.
///
/// All positions are character offsets, not bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buffer {
    rope: Rope,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Buffer {
            rope: Rope::from_str(text),
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns a new buffer with `text` inserted at character position `pos`.
    /// Positions past the end are clamped.
    pub fn insert(&self, pos: usize, text: &str) -> Buffer {
        let mut rope = self.rope.clone();
        rope.insert(pos.min(rope.len_chars()), text);
        Buffer { rope }
    }

    /// Returns a new buffer with characters in `[p1, p2)` removed.
    /// Bounds are clamped and swapped if reversed.
    pub fn erase(&self, p1: usize, p2: usize) -> Buffer {
        let len = self.rope.len_chars();
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let mut rope = self.rope.clone();
        rope.remove(lo.min(len)..hi.min(len));
        Buffer { rope }
    }

    /// Extracts the characters in `[p1, p2)` as an owned string.
    pub fn slice_string(&self, p1: usize, p2: usize) -> String {
        let len = self.rope.len_chars();
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        self.rope.slice(lo.min(len)..hi.min(len)).to_string()
    }

    pub fn chars(&self) -> Chars<'_> {
        self.rope.chars()
    }

    /// Iterator over the characters from position `pos` to the end.
    pub fn chars_at(&self, pos: usize) -> Chars<'_> {
        self.rope.chars_at(pos.min(self.rope.len_chars()))
    }

    /// Iterator over the characters before position `pos`, walking backwards.
    pub fn chars_before(&self, pos: usize) -> Chars<'_> {
        self.rope
            .chars_at(pos.min(self.rope.len_chars()))
            .reversed()
    }
}

impl std::fmt::Display for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rope)
    }
}

impl From<&str> for Buffer {
    fn from(text: &str) -> Self {
        Buffer::from_text(text)
    }
}
