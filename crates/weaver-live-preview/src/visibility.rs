//! Cursor-driven visibility of markdown syntax.
//!
//! Constructs render as formatted output everywhere except on the lines the
//! cursor or a selection touches, where raw syntax is revealed. The rule is
//! line based: a construct is hidden unless one of its lines is "active".

use std::ops::Range;

use crate::text::TextBuffer;
use crate::types::CursorState;

/// Active line ranges for one rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VisibilityState {
    /// Byte spans of the lines touched by the cursor or a selection, line
    /// breaks included. A span reaching the last line is open-ended.
    active: Vec<Range<usize>>,
    read_only: bool,
    /// 1-based line of the primary cursor head.
    cursor_line: usize,
}

impl VisibilityState {
    /// Compute active lines from the cursor and selections.
    pub fn calculate<T: TextBuffer + ?Sized>(text: &T, cursor: &CursorState) -> Self {
        let mut lines: Vec<(usize, usize)> = cursor
            .selections
            .iter()
            .map(|sel| (text.byte_to_line(sel.start()), text.byte_to_line(sel.end())))
            .collect();
        let head_line = text.byte_to_line(cursor.head);
        if !lines.iter().any(|&(a, b)| a <= head_line && head_line <= b) {
            lines.push((head_line, head_line));
        }

        let line_count = text.len_lines();
        let active = lines
            .iter()
            .map(|&(first, last)| {
                let end = if last + 1 < line_count {
                    text.line_to_byte(last + 1)
                } else {
                    usize::MAX
                };
                text.line_to_byte(first)..end
            })
            .collect();

        tracing::trace!(
            target: "weaver::live_preview::visibility",
            cursor_line = head_line + 1,
            active = lines.len(),
            read_only = cursor.read_only,
            "calculated visibility"
        );

        Self {
            active,
            read_only: cursor.read_only,
            cursor_line: head_line + 1,
        }
    }

    /// 1-based line number of the primary cursor.
    pub fn cursor_line(&self) -> usize {
        self.cursor_line
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether a construct spanning `from..to` should be rendered (its syntax
    /// hidden). Read-only views always render.
    pub fn should_hide(&self, from: usize, to: usize) -> bool {
        if self.read_only {
            return true;
        }
        // The last byte of the range, so a range ending exactly at a line
        // break does not spill onto the next line.
        let last = if to > from { to - 1 } else { from };
        !self
            .active
            .iter()
            .any(|span| from < span.end && span.start <= last)
    }

    pub fn should_hide_range(&self, range: &Range<usize>) -> bool {
        self.should_hide(range.start, range.end)
    }
}
