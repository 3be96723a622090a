//! Text buffer abstraction for decoration passes.
//!
//! The `TextBuffer` trait provides the line/offset addressing the engine needs
//! from the host buffer. All offsets are UTF-8 byte offsets, which is what the
//! markdown parser and the regex passes report.

use std::borrow::Cow;
use std::ops::{Range, RangeInclusive};

use crate::types::TextEdit;

/// A read-only view over the host's text with line addressing.
///
/// Lines are numbered from 0 here; the cursor rule reports 1-based lines.
pub trait TextBuffer {
    /// Total length in bytes (UTF-8).
    fn len_bytes(&self) -> usize;

    /// Number of lines. An empty buffer has one (empty) line.
    fn len_lines(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_bytes() == 0
    }

    /// Line index (0-based) containing the byte offset. Offsets past the end
    /// clamp to the last line.
    fn byte_to_line(&self, byte: usize) -> usize;

    /// Byte offset where the line starts.
    fn line_to_byte(&self, line: usize) -> usize;

    /// Byte range of a line, excluding its line break.
    fn line_range(&self, line: usize) -> Range<usize>;

    /// Get the text of a byte range. Out-of-bounds ends are clamped; a range
    /// that splits a character yields an empty string.
    fn slice(&self, range: Range<usize>) -> Cow<'_, str>;

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;

    /// Text of a line, excluding its line break.
    fn line_text(&self, line: usize) -> Cow<'_, str> {
        self.slice(self.line_range(line))
    }

    /// 1-based line number containing the byte offset.
    fn line_number(&self, byte: usize) -> usize {
        self.byte_to_line(byte) + 1
    }

    /// Lines touched by `range`, judged by its first and last byte. Line
    /// breaks belong to the line they end.
    fn lines_of(&self, range: &Range<usize>) -> RangeInclusive<usize> {
        let last = if range.end > range.start {
            range.end - 1
        } else {
            range.start
        };
        self.byte_to_line(range.start)..=self.byte_to_line(last)
    }
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) line lookups so rebuilds stay proportional to the
/// viewport rather than the document.
#[derive(Clone, Default)]
pub struct EditorRope {
    rope: ropey::Rope,
}

impl EditorRope {
    /// Create a new empty rope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from string.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope (for advanced operations).
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }

    /// Apply a byte-addressed edit, e.g. one produced by autocomplete or a
    /// checkbox toggle.
    pub fn apply(&mut self, edit: &TextEdit) {
        let len = self.rope.len_bytes();
        let start = self.rope.byte_to_char(edit.range.start.min(len));
        let end = self.rope.byte_to_char(edit.range.end.min(len)).max(start);
        self.rope.remove(start..end);
        self.rope.insert(start, &edit.insert);
    }
}

impl TextBuffer for EditorRope {
    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    fn byte_to_line(&self, byte: usize) -> usize {
        self.rope.byte_to_line(byte.min(self.rope.len_bytes()))
    }

    fn line_to_byte(&self, line: usize) -> usize {
        self.rope.line_to_byte(line.min(self.rope.len_lines()))
    }

    fn line_range(&self, line: usize) -> Range<usize> {
        let start = self.line_to_byte(line);
        let mut end = self.line_to_byte(line + 1);
        // Strip the line break; ropey keeps it on the line.
        let bytes = self.rope.byte_slice(start..end);
        let mut chars = bytes.chars_at(bytes.len_chars());
        while let Some(c) = chars.prev() {
            if c == '\n' || c == '\r' {
                end -= 1;
            } else {
                break;
            }
        }
        start..end
    }

    fn slice(&self, range: Range<usize>) -> Cow<'_, str> {
        let end = range.end.min(self.rope.len_bytes());
        let start = range.start.min(end);
        match self.rope.get_byte_slice(start..end) {
            Some(slice) => match slice.as_str() {
                Some(s) => Cow::Borrowed(s),
                None => Cow::Owned(slice.to_string()),
            },
            None => Cow::Borrowed(""),
        }
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }
}

impl From<&str> for EditorRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for EditorRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_addressing() {
        let rope = EditorRope::from_str("one\ntwo\r\n\nfour");
        assert_eq!(rope.len_lines(), 4);
        assert_eq!(rope.byte_to_line(0), 0);
        assert_eq!(rope.byte_to_line(4), 1);
        assert_eq!(rope.line_range(1), 4..7);
        assert_eq!(rope.line_text(1), "two");
        assert_eq!(rope.line_range(2), 9..9);
        assert_eq!(rope.line_text(3), "four");
        assert_eq!(rope.line_number(10), 4);
    }

    #[test]
    fn test_offsets_clamp() {
        let rope = EditorRope::from_str("ab\ncd");
        assert_eq!(rope.byte_to_line(100), 1);
        assert_eq!(rope.slice(3..100), "cd");
    }

    #[test]
    fn test_multibyte_slice() {
        // "héllo" - é is 2 bytes
        let rope = EditorRope::from_str("héllo\nwörld");
        assert_eq!(rope.line_range(0), 0..6);
        assert_eq!(rope.slice(7..13), "wörld");
        // Splitting `ö` gives nothing rather than a panic.
        assert_eq!(rope.slice(7..9), "");
    }

    #[test]
    fn test_lines_of() {
        let rope = EditorRope::from_str("# a\n\n> b\n> c\n");
        assert_eq!(rope.lines_of(&(5..13)), 2..=3);
        assert_eq!(rope.lines_of(&(5..12)), 2..=3);
        assert_eq!(rope.lines_of(&(5..9)), 2..=2);
        assert_eq!(rope.lines_of(&(3..3)), 0..=0);
    }

    #[test]
    fn test_apply_edit() {
        let mut rope = EditorRope::from_str("- [ ] milk");
        rope.apply(&TextEdit {
            range: 2..5,
            insert: "[x]".to_string(),
        });
        assert_eq!(rope.to_string(), "- [x] milk");
    }
}
