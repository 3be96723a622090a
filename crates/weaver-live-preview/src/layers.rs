//! The two decoration layers.
//!
//! The inline layer covers the viewport and never replaces across a line
//! break. The block layer covers the whole document and is the only one that
//! may replace multi-line ranges (tables, display math, diagrams). Both are
//! pure functions of the same inputs.

use std::ops::Range;

use crate::config::EngineConfig;
use crate::decoration::{DecorationBuilder, DecorationSet};
use crate::host::LinkPreview;
use crate::math::{MathMatch, find_math};
use crate::renderer::Theme;
use crate::scanner::{FootnoteIndex, Scanner};
use crate::table::find_tables;
use crate::text::TextBuffer;
use crate::tree::{NodeKind, SyntaxTree, in_ranges, merge_ranges};
use crate::types::{CursorState, Viewport};
use crate::visibility::VisibilityState;
use crate::walker::{FenceLines, Walker, fence_language};
use crate::widget::Widget;

/// Whole-document facts both layers read. Depends only on the text and its
/// tree, so it is rebuilt on document changes and reused across cursor and
/// scroll updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentIndex {
    footnotes: FootnoteIndex,
    math: Vec<MathMatch>,
    math_ranges: Vec<Range<usize>>,
    /// Code and formula ranges, sorted and merged.
    excluded: Vec<Range<usize>>,
}

impl DocumentIndex {
    pub fn build(text: &dyn TextBuffer, tree: &SyntaxTree) -> Self {
        let source = text.slice(0..text.len_bytes());
        let code = tree.code_ranges();
        let math = find_math(&source, |offset| in_ranges(code, offset));
        let math_ranges = merge_ranges(math.iter().map(|m| m.range.clone()).collect());
        let excluded = merge_ranges(code.iter().chain(&math_ranges).cloned().collect());
        let footnotes = FootnoteIndex::collect(&source, |offset| in_ranges(&excluded, offset));
        tracing::debug!(
            target: "weaver::live_preview::layers",
            footnotes = footnotes.len(),
            formulas = math.len(),
            excluded = excluded.len(),
            "indexed document"
        );
        Self {
            footnotes,
            math,
            math_ranges,
            excluded,
        }
    }

    pub fn footnotes(&self) -> &FootnoteIndex {
        &self.footnotes
    }

    /// Formulas in document order.
    pub fn math(&self) -> &[MathMatch] {
        &self.math
    }

    pub fn excluded(&self) -> &[Range<usize>] {
        &self.excluded
    }
}

/// Everything a rebuild reads.
#[derive(Clone, Copy)]
pub struct View<'a> {
    pub text: &'a dyn TextBuffer,
    pub tree: &'a SyntaxTree,
    pub index: &'a DocumentIndex,
    pub cursor: &'a CursorState,
    pub viewport: &'a Viewport,
    pub config: &'a EngineConfig,
    pub theme: Theme,
    pub link_preview: &'a dyn LinkPreview,
}

/// Walker and scanner output for the visible ranges.
pub fn build_inline_layer(view: &View<'_>) -> DecorationSet {
    let visibility = VisibilityState::calculate(view.text, view.cursor);
    let mut builder = DecorationBuilder::new();

    let walker = Walker::new(view.text, view.tree, view.viewport, view.config, view.link_preview)
        .skip_math(&view.index.math_ranges);
    walker.walk(&mut builder);

    let links = walker.link_ranges();
    Scanner::new(
        view.text,
        view.index.excluded(),
        view.index.footnotes(),
        view.config,
        view.link_preview,
    )
    .with_links(&links)
    .scan_lines(&mut builder, walker.lines().iter().copied());

    tracing::trace!(
        target: "weaver::live_preview::layers",
        candidates = builder.len(),
        lines = walker.lines().len(),
        "inline layer candidates"
    );
    builder.finish_inline(&visibility, view.text)
}

/// Tables, math and diagrams across the whole document.
pub fn build_block_layer(view: &View<'_>) -> DecorationSet {
    let source = view.text.slice(0..view.text.len_bytes());
    let visibility = VisibilityState::calculate(view.text, view.cursor);
    let code = view.tree.code_ranges();

    let mut builder = DecorationBuilder::new();

    let tables = find_tables(&source, |offset| in_ranges(code, offset));
    for table in &tables {
        let widget = Widget::Table(table.data.clone());
        builder.replace_block(table.range.clone(), widget, table.range.clone());
    }

    for math in view.index.math() {
        if tables
            .iter()
            .any(|t| math.range.start < t.range.end && t.range.start < math.range.end)
        {
            continue;
        }
        let widget = Widget::Math {
            source: math.source.clone(),
            display: math.display,
        };
        if math.display {
            builder.replace_block(math.range.clone(), widget, math.range.clone());
        } else {
            builder.replace(math.range.clone(), widget, math.range.clone());
        }
    }

    for (_, node) in view.tree.iter() {
        let NodeKind::CodeBlock { fenced: true, info } = &node.kind else {
            continue;
        };
        let is_diagram = fence_language(info)
            .is_some_and(|lang| lang.eq_ignore_ascii_case(&view.config.diagram_language));
        if !is_diagram || node.range.end > source.len() {
            continue;
        }
        let Some(fence) = FenceLines::find(view.text, &node.range) else {
            continue;
        };
        let whole = fence.whole();
        let widget = Widget::Diagram {
            source: source[fence.body.clone()].to_string(),
            theme: view.theme,
        };
        builder.replace_block(whole.clone(), widget, whole);
    }

    tracing::trace!(
        target: "weaver::live_preview::layers",
        candidates = builder.len(),
        tables = tables.len(),
        "block layer candidates"
    );
    builder.finish_block(&visibility)
}
