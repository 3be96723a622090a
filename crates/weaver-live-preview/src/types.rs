//! Core view types: cursor, selection and viewport.
//!
//! These types are framework-agnostic; the host converts its own selection
//! and viewport notifications into them before asking for a rebuild.

use std::ops::Range;

use crate::text::TextBuffer;

/// Cursor and selection state for one rebuild.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CursorState {
    /// Byte offset of the primary cursor head.
    pub head: usize,

    /// Every selection range, including the primary one. May be empty when
    /// the host only reports a collapsed cursor.
    pub selections: Vec<Selection>,

    /// Read-only views always render every construct.
    pub read_only: bool,
}

impl CursorState {
    /// Create a collapsed cursor at the given offset.
    pub fn new(head: usize) -> Self {
        Self {
            head,
            selections: vec![Selection::collapsed(head)],
            read_only: false,
        }
    }

    /// Create a cursor from a set of selections. The head of the last
    /// selection is treated as the primary cursor.
    pub fn with_selections(selections: Vec<Selection>) -> Self {
        let head = selections.last().map(|s| s.head).unwrap_or(0);
        Self {
            head,
            selections,
            read_only: false,
        }
    }

    /// Same state, marked read-only.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Convert to a Range<usize> (ordered).
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// Byte ranges of the document currently visible in the host view.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Viewport {
    pub ranges: Vec<Range<usize>>,
}

impl Viewport {
    pub fn new(ranges: Vec<Range<usize>>) -> Self {
        Self { ranges }
    }

    /// A viewport covering the whole of a document of `len` bytes.
    pub fn full(len: usize) -> Self {
        Self { ranges: vec![0..len] }
    }

    /// Whether `range` touches any visible range. Touching at a boundary
    /// counts, so zero-width constructs at the edge are still visited.
    pub fn intersects(&self, range: &Range<usize>) -> bool {
        self.ranges
            .iter()
            .any(|r| range.start <= r.end && range.end >= r.start)
    }

    /// 0-based lines the visible ranges touch, sorted and deduplicated.
    pub fn lines<T: TextBuffer + ?Sized>(&self, text: &T) -> Vec<usize> {
        let mut lines = Vec::new();
        for range in &self.ranges {
            lines.extend(text.byte_to_line(range.start)..=text.byte_to_line(range.end));
        }
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

/// A replacement the host should apply to the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub insert: String,
}
