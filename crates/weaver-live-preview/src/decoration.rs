//! Decoration spans and the builder that turns candidates into a
//! well-formed, ordered set.

use std::collections::HashSet;
use std::ops::Range;

use smol_str::SmolStr;

use crate::text::TextBuffer;
use crate::visibility::VisibilityState;
use crate::widget::Widget;

/// What a span does to the text it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Collapse the range to nothing.
    Hide,
    /// Style the range with a class.
    Mark(SmolStr),
    /// Replace the range (possibly empty) with an inline widget.
    ReplaceInline(Widget),
    /// Replace whole lines with a block widget.
    ReplaceBlock(Widget),
    /// Add a class to the line containing `from`.
    LineClass(SmolStr),
}

impl SpanKind {
    /// Order of kinds that share a start and end: line classes wrap
    /// everything else, replacements go before marks.
    fn rank(&self) -> u8 {
        match self {
            SpanKind::LineClass(_) => 0,
            SpanKind::ReplaceBlock(_) => 1,
            SpanKind::ReplaceInline(_) => 2,
            SpanKind::Hide => 3,
            SpanKind::Mark(_) => 4,
        }
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, SpanKind::ReplaceInline(_) | SpanKind::ReplaceBlock(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub kind: SpanKind,
}

impl Span {
    pub fn new(range: Range<usize>, kind: SpanKind) -> Self {
        Self {
            from: range.start,
            to: range.end,
            kind,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }

    pub fn class(&self) -> Option<&str> {
        match &self.kind {
            SpanKind::Mark(class) | SpanKind::LineClass(class) => Some(class),
            _ => None,
        }
    }

    pub fn widget(&self) -> Option<&Widget> {
        match &self.kind {
            SpanKind::ReplaceInline(widget) | SpanKind::ReplaceBlock(widget) => Some(widget),
            _ => None,
        }
    }
}

/// When a candidate span applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// Only while the construct covering this range renders.
    WhenHidden(Range<usize>),
    /// Only while the construct covering this range shows raw syntax.
    WhenRevealed(Range<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub span: Span,
    pub condition: Condition,
}

/// Collects candidate spans for one layer, then filters and orders them.
#[derive(Debug, Default)]
pub struct DecorationBuilder {
    candidates: Vec<Candidate>,
}

impl DecorationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, range: Range<usize>, kind: SpanKind, condition: Condition) {
        if range.start > range.end {
            tracing::warn!(
                target: "weaver::live_preview::decoration",
                from = range.start,
                to = range.end,
                "dropping inverted span"
            );
            return;
        }
        self.candidates.push(Candidate {
            span: Span::new(range, kind),
            condition,
        });
    }

    /// Hide `range` while the construct spanning `construct` renders.
    pub fn hide(&mut self, range: Range<usize>, construct: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.push(range, SpanKind::Hide, Condition::WhenHidden(construct));
    }

    pub fn mark(&mut self, range: Range<usize>, class: impl Into<SmolStr>) {
        if range.is_empty() {
            return;
        }
        self.push(range, SpanKind::Mark(class.into()), Condition::Always);
    }

    pub fn mark_when(
        &mut self,
        range: Range<usize>,
        class: impl Into<SmolStr>,
        condition: Condition,
    ) {
        if range.is_empty() {
            return;
        }
        self.push(range, SpanKind::Mark(class.into()), condition);
    }

    /// Replace `range` with a widget while the construct renders.
    pub fn replace(&mut self, range: Range<usize>, widget: Widget, construct: Range<usize>) {
        self.push(range, SpanKind::ReplaceInline(widget), Condition::WhenHidden(construct));
    }

    pub fn replace_always(&mut self, range: Range<usize>, widget: Widget) {
        self.push(range, SpanKind::ReplaceInline(widget), Condition::Always);
    }

    pub fn replace_block(&mut self, range: Range<usize>, widget: Widget, construct: Range<usize>) {
        self.push(range, SpanKind::ReplaceBlock(widget), Condition::WhenHidden(construct));
    }

    /// Class for a whole line. `line` is the line's text range.
    pub fn line_class(&mut self, line: Range<usize>, class: impl Into<SmolStr>) {
        self.push(line, SpanKind::LineClass(class.into()), Condition::Always);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Apply the cursor rule for the inline layer. Block replacements and
    /// inline replacements that cross a line break are dropped.
    pub fn finish_inline(
        self,
        visibility: &VisibilityState,
        text: &dyn TextBuffer,
    ) -> DecorationSet {
        self.finish_with(visibility, |span| {
            let crosses = match &span.kind {
                SpanKind::ReplaceBlock(_) => true,
                SpanKind::ReplaceInline(_) => {
                    span.to > span.from
                        && text.byte_to_line(span.from) != text.byte_to_line(span.to - 1)
                }
                _ => false,
            };
            if crosses {
                tracing::warn!(
                    target: "weaver::live_preview::decoration",
                    from = span.from,
                    to = span.to,
                    "dropping multi-line replacement from inline layer"
                );
            }
            !crosses
        })
    }

    /// Apply the cursor rule for the block layer, which may replace whole
    /// lines.
    pub fn finish_block(self, visibility: &VisibilityState) -> DecorationSet {
        self.finish_with(visibility, |_| true)
    }

    fn finish_with(
        self,
        visibility: &VisibilityState,
        keep: impl Fn(&Span) -> bool,
    ) -> DecorationSet {
        let total = self.candidates.len();
        let spans: Vec<Span> = self
            .candidates
            .into_iter()
            .filter(|candidate| match &candidate.condition {
                Condition::Always => true,
                Condition::WhenHidden(range) => visibility.should_hide_range(range),
                Condition::WhenRevealed(range) => !visibility.should_hide_range(range),
            })
            .map(|candidate| candidate.span)
            .filter(|span| keep(span))
            .collect();

        let set = DecorationSet::from_spans(spans);
        tracing::trace!(
            target: "weaver::live_preview::decoration",
            candidates = total,
            spans = set.len(),
            "built decoration set"
        );
        set
    }
}

/// An ordered decoration set for one layer.
///
/// Spans are sorted by `(from, to)`, exact duplicates are removed and no
/// offset is covered by both a hide and an inline replacement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecorationSet {
    spans: Vec<Span>,
}

impl DecorationSet {
    pub fn from_spans(mut spans: Vec<Span>) -> Self {
        spans.sort_by(|a, b| {
            (a.from, a.to, a.kind.rank()).cmp(&(b.from, b.to, b.kind.rank()))
        });
        let mut seen = HashSet::with_capacity(spans.len());
        spans.retain(|span| seen.insert(span.clone()));

        // Replacements claim their range in order; later overlapping
        // replacements and hides inside a claimed range are dropped.
        let mut claimed: Vec<Range<usize>> = Vec::new();
        for span in &spans {
            if matches!(span.kind, SpanKind::ReplaceInline(_))
                && span.to > span.from
                && !overlaps_any(&claimed, span.from, span.to)
            {
                claimed.push(span.range());
            }
        }

        let mut kept: Vec<Range<usize>> = Vec::new();
        spans.retain(|span| match span.kind {
            SpanKind::Hide => !overlaps_any(&claimed, span.from, span.to),
            SpanKind::ReplaceInline(_) if span.to > span.from => {
                // The first replacement of a range was the one claimed.
                if overlaps_any(&kept, span.from, span.to) {
                    false
                } else {
                    kept.push(span.range());
                    true
                }
            }
            _ => true,
        });

        Self { spans }
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    /// Spans of one kind variant, e.g. every `Hide`.
    pub fn hides(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|s| matches!(s.kind, SpanKind::Hide))
    }

    pub fn widgets(&self) -> impl Iterator<Item = (&Span, &Widget)> {
        self.spans.iter().filter_map(|s| s.widget().map(|w| (s, w)))
    }

    pub fn marks(&self) -> impl Iterator<Item = (&Span, &str)> {
        self.spans.iter().filter_map(|s| match &s.kind {
            SpanKind::Mark(class) => Some((s, class.as_str())),
            _ => None,
        })
    }

    pub fn line_classes(&self) -> impl Iterator<Item = (&Span, &str)> {
        self.spans.iter().filter_map(|s| match &s.kind {
            SpanKind::LineClass(class) => Some((s, class.as_str())),
            _ => None,
        })
    }

    /// Readable dump, one span per line: `from..to kind`.
    pub fn debug_dump(&self, source: &str) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        for span in &self.spans {
            let text = source.get(span.range()).unwrap_or("");
            let _ = match &span.kind {
                SpanKind::Hide => writeln!(out, "{}..{} hide {text:?}", span.from, span.to),
                SpanKind::Mark(class) => {
                    writeln!(out, "{}..{} mark {class} {text:?}", span.from, span.to)
                }
                SpanKind::LineClass(class) => {
                    writeln!(out, "{}..{} line {class}", span.from, span.to)
                }
                SpanKind::ReplaceInline(widget) => {
                    writeln!(out, "{}..{} widget {}", span.from, span.to, widget.kind_name())
                }
                SpanKind::ReplaceBlock(widget) => {
                    writeln!(out, "{}..{} block {}", span.from, span.to, widget.kind_name())
                }
            };
        }
        out
    }
}

impl<'a> IntoIterator for &'a DecorationSet {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}

fn overlaps_any(ranges: &[Range<usize>], from: usize, to: usize) -> bool {
    ranges.iter().any(|r| from < r.end && r.start < to)
}
