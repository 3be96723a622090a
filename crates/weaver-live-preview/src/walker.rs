//! Tree walker: decorations for constructs the markdown parser models.
//!
//! One pass over the syntax tree, visiting only nodes that touch the
//! viewport. Delimiters are hidden while their construct renders; marks and
//! line classes stay in place regardless of the cursor so the text keeps its
//! styling while being edited.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::{SmolStr, format_smolstr};
use syntect::parsing::SyntaxSet;
use url::Url;

use crate::config::EngineConfig;
use crate::decoration::{Condition, DecorationBuilder};
use crate::host::LinkPreview;
use crate::text::TextBuffer;
use crate::tree::{NodeId, NodeKind, SyntaxTree, in_ranges};
use crate::types::Viewport;
use crate::widget::Widget;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

static CALLOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*>[>\s]*(\[!([A-Za-z][\w-]*)\])\s*(.*)$").expect("valid callout regex")
});

static TASK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[ xX]\]").expect("valid task marker regex"));

/// Human-readable name for a fence language, e.g. `rs` → `Rust`.
pub fn language_label(language: &str) -> SmolStr {
    SYNTAX_SET
        .find_syntax_by_token(language)
        .map(|syntax| SmolStr::new(&syntax.name))
        .unwrap_or_else(|| SmolStr::new(language))
}

/// First word of a fence info string.
pub fn fence_language(info: &str) -> Option<&str> {
    info.split_whitespace().next().filter(|lang| !lang.is_empty())
}

pub struct Walker<'a> {
    text: &'a dyn TextBuffer,
    tree: &'a SyntaxTree,
    viewport: &'a Viewport,
    config: &'a EngineConfig,
    link_preview: &'a dyn LinkPreview,
    /// Nodes touching the viewport, in document order.
    nodes: Vec<NodeId>,
    /// Visible lines, sorted.
    lines: Vec<usize>,
    /// Formula ranges, sorted and disjoint. Nodes starting inside one are
    /// part of the formula source.
    math: &'a [Range<usize>],
}

impl<'a> Walker<'a> {
    pub fn new(
        text: &'a dyn TextBuffer,
        tree: &'a SyntaxTree,
        viewport: &'a Viewport,
        config: &'a EngineConfig,
        link_preview: &'a dyn LinkPreview,
    ) -> Self {
        Self {
            text,
            tree,
            viewport,
            config,
            link_preview,
            nodes: tree.touching(&viewport.ranges),
            lines: viewport.lines(text),
            math: &[],
        }
    }

    pub fn skip_math(mut self, math: &'a [Range<usize>]) -> Self {
        self.math = math;
        self
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    /// Link and image syntax in view.
    pub fn link_ranges(&self) -> Vec<Range<usize>> {
        self.nodes
            .iter()
            .map(|&id| self.tree.node(id))
            .filter(|node| matches!(node.kind, NodeKind::Link { .. } | NodeKind::Image { .. }))
            .map(|node| node.range.clone())
            .collect()
    }

    pub fn walk(&self, builder: &mut DecorationBuilder) {
        let len = self.text.len_bytes();
        let mut visited = 0usize;
        for &id in &self.nodes {
            let node = self.tree.node(id);
            if node.range.end > len || in_ranges(self.math, node.range.start) {
                continue;
            }
            visited += 1;
            let range = node.range.clone();
            match &node.kind {
                NodeKind::Emphasis => self.paired(builder, range, 1, "md-em"),
                NodeKind::Strong => self.paired(builder, range, 2, "md-strong"),
                NodeKind::Strikethrough => {
                    // Single-tilde pairs are subscript, left to the scanner.
                    if self.text.slice(range.clone()).starts_with("~~") {
                        self.paired(builder, range, 2, "md-strike");
                    }
                }
                NodeKind::InlineCode => self.inline_code(builder, range),
                NodeKind::Heading { level } => self.heading(builder, range, *level),
                NodeKind::Rule => self.rule(builder, range),
                NodeKind::TaskMarker { checked } => self.task(builder, range, *checked),
                NodeKind::Item => self.item(builder, id),
                NodeKind::BlockQuote => {
                    let nested = self
                        .tree
                        .ancestors(id)
                        .any(|a| self.tree.node(a).kind == NodeKind::BlockQuote);
                    if !nested {
                        self.blockquote(builder, range);
                    }
                }
                NodeKind::Link { dest } => self.link(builder, range, dest),
                NodeKind::Image { dest } => self.image(builder, range, dest),
                NodeKind::CodeBlock { fenced: true, info } => {
                    self.fenced_code(builder, range, info)
                }
                NodeKind::CodeBlock { fenced: false, .. } => {
                    for &line in self.visible_lines_in(&range) {
                        builder.line_class(self.text.line_range(line), "md-code-line");
                    }
                }
                _ => {}
            }
        }
        tracing::trace!(target: "weaver::live_preview::walker", visited, "walked syntax tree");
    }

    /// Visible lines that `range` touches.
    fn visible_lines_in(&self, range: &Range<usize>) -> &[usize] {
        let span = self.text.lines_of(range);
        let from = self.lines.partition_point(|&l| l < *span.start());
        let to = self.lines.partition_point(|&l| l <= *span.end());
        &self.lines[from..to.max(from)]
    }

    fn line_at(&self, offset: usize) -> Range<usize> {
        self.text.line_range(self.text.byte_to_line(offset))
    }

    fn paired(
        &self,
        builder: &mut DecorationBuilder,
        range: Range<usize>,
        width: usize,
        class: &'static str,
    ) {
        if range.len() < width * 2 {
            return;
        }
        builder.hide(range.start..range.start + width, range.clone());
        builder.hide(range.end - width..range.end, range.clone());
        builder.mark(range.start + width..range.end - width, class);
    }

    fn inline_code(&self, builder: &mut DecorationBuilder, range: Range<usize>) {
        let text = self.text.slice(range.clone());
        let open = text.len() - text.trim_start_matches('`').len();
        let close = text.len() - text.trim_end_matches('`').len();
        if open == 0 || close == 0 || open + close >= text.len() {
            return;
        }
        builder.hide(range.start..range.start + open, range.clone());
        builder.hide(range.end - close..range.end, range.clone());
        builder.mark(range.start + open..range.end - close, "md-code");
    }

    fn heading(&self, builder: &mut DecorationBuilder, range: Range<usize>, level: u8) {
        let line = self.line_at(range.start);
        let text = self.text.slice(line.clone());
        let indent = text.len() - text.trim_start_matches(' ').len();
        let hashes = text[indent..].len() - text[indent..].trim_start_matches('#').len();
        if hashes > 0 {
            let mut marker_end = indent + hashes;
            if text[marker_end..].starts_with([' ', '\t']) {
                marker_end += 1;
            }
            builder.hide(line.start..line.start + marker_end, line.clone());
        }
        let level = level.clamp(1, 6);
        builder.line_class(line, format_smolstr!("md-heading md-heading-{level}"));
    }

    fn rule(&self, builder: &mut DecorationBuilder, range: Range<usize>) {
        let line = self.line_at(range.start);
        builder.replace(line.clone(), Widget::Rule, line);
    }

    fn task(&self, builder: &mut DecorationBuilder, range: Range<usize>, checked: bool) {
        let line = self.line_at(range.start);
        let search = range.start.max(line.start)..line.end;
        if search.is_empty() {
            return;
        }
        let Some(found) = TASK_MARKER.find(&self.text.slice(search.clone())).map(|m| m.start())
        else {
            return;
        };
        let offset = search.start + found;
        builder.replace_always(offset..offset + 3, Widget::Checkbox { checked, offset });
        if checked {
            builder.line_class(line, "md-task-done");
        }
    }

    fn item(&self, builder: &mut DecorationBuilder, id: NodeId) {
        let node = self.tree.node(id);
        let depth = self.tree.nesting_depth(id, self.config.max_list_depth);
        let line = self.line_at(node.range.start);
        builder.line_class(line.clone(), format_smolstr!("md-list-item md-list-depth-{depth}"));

        let ordered = node
            .parent
            .is_some_and(|p| matches!(self.tree.node(p).kind, NodeKind::List { ordered: true }));
        // Descendants follow the item in pre-order; only those on its first
        // line matter.
        let has_task = (id + 1..self.tree.len())
            .map(|c| self.tree.node(c))
            .take_while(|child| child.range.start <= line.end)
            .any(|child| {
                matches!(child.kind, NodeKind::TaskMarker { .. })
                    && child.range.end <= node.range.end
            });
        if ordered || has_task || node.range.start > line.end {
            return;
        }

        let text = self.text.slice(node.range.start..line.end);
        let skipped = text.len() - text.trim_start().len();
        if !matches!(text.as_bytes().get(skipped), Some(b'-' | b'*' | b'+')) {
            return;
        }
        let follows_space = text[skipped + 1..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace);
        if follows_space {
            let marker = node.range.start + skipped;
            let glyph = SmolStr::new(self.config.bullet_for_depth(depth));
            builder.replace(marker..marker + 1, Widget::Bullet { depth, glyph }, line);
        }
    }

    fn blockquote(&self, builder: &mut DecorationBuilder, range: Range<usize>) {
        let first = self.line_at(range.start);
        let first_text = self.text.slice(first.clone());
        let callout = CALLOUT.captures(&first_text).and_then(|caps| {
            let token = caps.get(1)?;
            let kind = caps.get(2)?;
            let title = caps.get(3)?;
            Some((
                first.start + token.start()..first.start + token.end(),
                kind.as_str().to_ascii_lowercase(),
                first.start + title.start()..first.start + title.end(),
            ))
        });

        for &index in self.visible_lines_in(&range) {
            let line = self.text.line_range(index);
            let text = self.text.slice(line.clone());
            let indent = text.len() - text.trim_start().len();
            // The `>` run, possibly spaced out (`> > nested`).
            let mut depth = 0u8;
            let mut end = indent;
            for (i, c) in text[indent..].char_indices() {
                match c {
                    '>' => {
                        depth = depth.saturating_add(1);
                        end = indent + i + 1;
                    }
                    ' ' | '\t' => {}
                    _ => break,
                }
            }
            if depth > 0 {
                if text[end..].starts_with([' ', '\t']) {
                    end += 1;
                }
                builder.hide(line.start + indent..line.start + end, line.clone());
            }

            match &callout {
                Some((_, kind, _)) => {
                    builder.line_class(line, format_smolstr!("md-callout md-callout-{kind}"));
                }
                None => {
                    let depth = depth.clamp(1, self.config.max_quote_depth.max(1));
                    builder.line_class(
                        line,
                        format_smolstr!("md-blockquote md-quote-depth-{depth}"),
                    );
                }
            }
        }

        if let Some((token, _, title)) = callout {
            let mut token_end = token.end;
            if first_text[token_end - first.start..].starts_with([' ', '\t']) {
                token_end += 1;
            }
            builder.hide(token.start..token_end, first.clone());
            builder.mark(title, "md-callout-title");
        }
    }

    fn link(&self, builder: &mut DecorationBuilder, range: Range<usize>, dest: &str) {
        let url = match Url::parse(dest) {
            Ok(url) if !self.config.is_web_scheme(url.scheme()) => {
                // Custom schemes belong to host extensions.
                return;
            }
            Ok(url) => Some(url),
            Err(_) => None,
        };

        let raw = self.text.slice(range.clone());
        let text = if let Some(inner) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
            1..1 + inner.len()
        } else if raw.starts_with('[') {
            match link_text_end(&raw) {
                Some(end) => 1..end,
                None => return,
            }
        } else {
            return;
        };
        let text_range = range.start + text.start..range.start + text.end;

        let lines = self.text.lines_of(&range);
        if lines.start() != lines.end() {
            builder.mark(text_range, "md-link-text");
            return;
        }

        let widget = Widget::Link {
            text: SmolStr::new(&raw[text]),
            url: SmolStr::new(dest),
            favicon: url.as_ref().and_then(|u| self.link_preview.favicon_url(u)),
        };
        builder.replace(range.clone(), widget, range.clone());
        builder.mark_when(text_range, "md-link-text", Condition::WhenRevealed(range));
    }

    fn image(&self, builder: &mut DecorationBuilder, range: Range<usize>, dest: &str) {
        let Ok(url) = Url::parse(dest) else {
            return;
        };
        if !self.config.is_image_scheme(url.scheme()) {
            return;
        }
        let lines = self.text.lines_of(&range);
        if lines.start() != lines.end() {
            return;
        }
        let raw = self.text.slice(range.clone());
        let alt = raw
            .strip_prefix("![")
            .and_then(|rest| link_text_end(&raw[1..]).map(|end| &rest[..end - 1]))
            .unwrap_or("");
        let widget = Widget::Image {
            alt: SmolStr::new(alt),
            url: SmolStr::new(dest),
        };
        builder.replace(range.clone(), widget, range);
    }

    fn fenced_code(&self, builder: &mut DecorationBuilder, range: Range<usize>, info: &str) {
        let language = fence_language(info);
        if language.is_some_and(|lang| lang.eq_ignore_ascii_case(&self.config.diagram_language)) {
            return;
        }
        let Some(fence) = FenceLines::find(self.text, &range) else {
            return;
        };

        for &index in self.visible_lines_in(&fence.body) {
            if fence.body_lines.contains(&index) {
                builder.line_class(self.text.line_range(index), "md-code-line");
            }
        }
        if self.viewport.intersects(&fence.close) {
            builder.hide(fence.close.clone(), fence.close.clone());
        }
        if !self.viewport.intersects(&fence.open) {
            return;
        }

        builder.hide(fence.open.clone(), fence.open.clone());
        let widget = Widget::CodeHeader {
            language: language.map(SmolStr::new),
            label: language
                .map(language_label)
                .unwrap_or_else(|| SmolStr::new_static("text")),
            code: self.text.slice(fence.body.clone()).into_owned(),
        };
        builder.replace(fence.body.start..fence.body.start, widget, fence.open);
    }
}

/// Line layout of a terminated fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceLines {
    /// Opening fence line (text range).
    pub open: Range<usize>,
    pub close: Range<usize>,
    /// Body text between the fences, without the final line break.
    pub body: Range<usize>,
    pub body_lines: Range<usize>,
}

impl FenceLines {
    /// `None` for unterminated fences, which stay plain text.
    pub fn find(text: &dyn TextBuffer, range: &Range<usize>) -> Option<Self> {
        let span = text.lines_of(range);
        let (open_index, close_index) = (*span.start(), *span.end());
        if close_index == open_index {
            return None;
        }
        let open = text.line_range(open_index);
        let open_line = text.slice(open.clone());
        let open_text = open_line.trim_start();
        let fence_char = match open_text.chars().next() {
            Some(c @ ('`' | '~')) => c,
            _ => return None,
        };
        let fence_len = open_text.len() - open_text.trim_start_matches(fence_char).len();

        let close = text.line_range(close_index);
        let close_line = text.slice(close.clone());
        let close_text = close_line.trim();
        if close_text.len() < fence_len || !close_text.chars().all(|c| c == fence_char) {
            return None;
        }

        let body_start = text.line_to_byte(open_index + 1);
        let body_end = if close_index > open_index + 1 {
            text.line_range(close_index - 1).end
        } else {
            body_start
        };
        Some(Self {
            open,
            close,
            body: body_start..body_end,
            body_lines: open_index + 1..close_index,
        })
    }

    /// From the start of the opening fence to the end of the closing one.
    pub fn whole(&self) -> Range<usize> {
        self.open.start..self.close.end
    }
}

/// Byte index of the `]` closing a link's text, for text starting with `[`.
fn link_text_end(raw: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::{DecorationSet, SpanKind};
    use crate::text::EditorRope;
    use crate::types::CursorState;
    use crate::visibility::VisibilityState;

    fn walk_at(source: &str, cursor: CursorState) -> DecorationSet {
        let rope = EditorRope::from_str(source);
        let tree = SyntaxTree::parse(source);
        let viewport = Viewport::full(source.len());
        let config = EngineConfig::default();
        let mut builder = DecorationBuilder::new();
        Walker::new(&rope, &tree, &viewport, &config, &()).walk(&mut builder);
        builder.finish_inline(&VisibilityState::calculate(&rope, &cursor), &rope)
    }

    fn walk(source: &str, cursor: usize) -> DecorationSet {
        walk_at(source, CursorState::new(cursor))
    }

    fn hidden(set: &DecorationSet, source: &str) -> Vec<String> {
        set.hides().map(|s| source[s.range()].to_string()).collect()
    }

    #[test]
    fn test_emphasis_hidden_off_cursor() {
        let src = "*a* **b** ~~c~~ `d`\nx";
        let set = walk(src, src.len());
        assert_eq!(hidden(&set, src), vec!["*", "*", "**", "**", "~~", "~~", "`", "`"]);
        let marks: Vec<(&str, &str)> = set.marks().map(|(s, c)| (&src[s.range()], c)).collect();
        assert_eq!(
            marks,
            vec![("a", "md-em"), ("b", "md-strong"), ("c", "md-strike"), ("d", "md-code")]
        );
    }

    #[test]
    fn test_cursor_reveals_and_read_only_does_not() {
        let src = "*a* **b** ~~c~~ `d`\nx";
        let set = walk(src, 1);
        assert_eq!(set.hides().count(), 0);
        assert_eq!(set.marks().count(), 4);

        let set = walk_at(src, CursorState::new(1).read_only());
        assert_eq!(set.hides().count(), 8);
    }

    #[test]
    fn test_heading() {
        let src = "## Title\n\nbody";
        let set = walk(src, src.len());
        assert_eq!(hidden(&set, src), vec!["## "]);
        let classes: Vec<&str> = set.line_classes().map(|(_, c)| c).collect();
        assert_eq!(classes, vec!["md-heading md-heading-2"]);
    }

    #[test]
    fn test_rule_revealed_on_its_line() {
        let src = "a\n\n---\n\nb";
        let set = walk(src, 0);
        let rule: Vec<&str> = set
            .widgets()
            .filter(|(_, w)| **w == Widget::Rule)
            .map(|(s, _)| &src[s.range()])
            .collect();
        assert_eq!(rule, vec!["---"]);
        assert_eq!(walk(src, 4).widgets().count(), 0);
    }

    #[test]
    fn test_tasks_and_bullets() {
        let src = "- [x] done\n- [ ] todo\n- plain\n  - nested\n\nend";
        let set = walk(src, src.len());
        let widgets: Vec<(&str, Widget)> =
            set.widgets().map(|(s, w)| (&src[s.range()], w.clone())).collect();
        assert_eq!(
            widgets,
            vec![
                ("[x]", Widget::Checkbox { checked: true, offset: 2 }),
                ("[ ]", Widget::Checkbox { checked: false, offset: 13 }),
                ("-", Widget::Bullet { depth: 1, glyph: "•".into() }),
                ("-", Widget::Bullet { depth: 2, glyph: "◦".into() }),
            ]
        );
        let classes: Vec<&str> = set.line_classes().map(|(_, c)| c).collect();
        assert!(classes.contains(&"md-task-done"));
        assert!(classes.contains(&"md-list-item md-list-depth-2"));

        // The checkbox stays on the cursor line; the bullet is revealed.
        let set = walk(src, 24);
        assert_eq!(set.widgets().count(), 3);
    }

    #[test]
    fn test_blockquote_and_callout() {
        let src = "> quoted\n> > deeper\n\n> [!NOTE] Heads up\n> body\n\nend";
        let set = walk(src, src.len());
        let classes: Vec<(&str, &str)> =
            set.line_classes().map(|(s, c)| (&src[s.range()], c)).collect();
        assert_eq!(
            classes,
            vec![
                ("> quoted", "md-blockquote md-quote-depth-1"),
                ("> > deeper", "md-blockquote md-quote-depth-2"),
                ("> [!NOTE] Heads up", "md-callout md-callout-note"),
                ("> body", "md-callout md-callout-note"),
            ]
        );
        assert_eq!(hidden(&set, src), vec!["> ", "> > ", "> ", "[!NOTE] ", "> "]);
        let title: Vec<&str> = set
            .marks()
            .filter(|(_, c)| *c == "md-callout-title")
            .map(|(s, _)| &src[s.range()])
            .collect();
        assert_eq!(title, vec!["Heads up"]);
    }

    #[test]
    fn test_links() {
        let src = "see [docs](https://docs.rs) and [note](note://abc) <https://a.io>\nx";
        let set = walk(src, src.len());
        let links: Vec<(&str, Widget)> =
            set.widgets().map(|(s, w)| (&src[s.range()], w.clone())).collect();
        assert_eq!(
            links,
            vec![
                (
                    "[docs](https://docs.rs)",
                    Widget::Link {
                        text: "docs".into(),
                        url: "https://docs.rs".into(),
                        favicon: None
                    }
                ),
                (
                    "<https://a.io>",
                    Widget::Link {
                        text: "https://a.io".into(),
                        url: "https://a.io".into(),
                        favicon: None
                    }
                ),
            ]
        );

        let set = walk(src, 0);
        assert_eq!(set.widgets().count(), 0);
        let texts: Vec<&str> = set.marks().map(|(s, _)| &src[s.range()]).collect();
        assert_eq!(texts, vec!["docs", "https://a.io"]);
    }

    #[test]
    fn test_images_web_only() {
        let src = "![cat](https://img.io/cat.png) ![local](file:///tmp/a.png)\nx";
        let set = walk(src, src.len());
        let widgets: Vec<Widget> = set.widgets().map(|(_, w)| w.clone()).collect();
        assert_eq!(
            widgets,
            vec![Widget::Image { alt: "cat".into(), url: "https://img.io/cat.png".into() }]
        );
    }

    #[test]
    fn test_fenced_code() {
        let src = "```rust\nfn main() {}\n```\n\nafter";
        let set = walk(src, src.len());
        assert_eq!(hidden(&set, src), vec!["```rust", "```"]);
        let header = set.widgets().find_map(|(s, w)| match w {
            Widget::CodeHeader { label, code, .. } => {
                Some((s.range(), label.clone(), code.clone()))
            }
            _ => None,
        });
        assert_eq!(header, Some((8..8, SmolStr::new("Rust"), "fn main() {}".to_string())));
        assert_eq!(
            set.line_classes().map(|(s, c)| (&src[s.range()], c)).collect::<Vec<_>>(),
            vec![("fn main() {}", "md-code-line")]
        );

        // Cursor on the opening fence reveals it and drops the header.
        let set = walk(src, 2);
        assert_eq!(hidden(&set, src), vec!["```"]);
        assert!(set.widgets().next().is_none());

        // Cursor on the closing fence only reveals that fence.
        let close = src.rfind("```").unwrap();
        let set = walk(src, close + 1);
        assert_eq!(hidden(&set, src), vec!["```rust"]);
        assert_eq!(set.hides().next().map(|s| s.range()), Some(0..7));
        let header = set.widgets().find_map(|(s, w)| match w {
            Widget::CodeHeader { label, .. } => Some((s.range(), label.clone())),
            _ => None,
        });
        assert_eq!(header, Some((8..8, SmolStr::new("Rust"))));
    }

    #[test]
    fn test_nodes_inside_formulas_skipped() {
        let src = "$a*b*c$ and *d*\nx";
        let rope = EditorRope::from_str(src);
        let tree = SyntaxTree::parse(src);
        let viewport = Viewport::full(src.len());
        let config = EngineConfig::default();
        let math = [0..7];
        let mut builder = DecorationBuilder::new();
        Walker::new(&rope, &tree, &viewport, &config, &())
            .skip_math(&math)
            .walk(&mut builder);
        let cursor = CursorState::new(src.len());
        let set = builder.finish_inline(&VisibilityState::calculate(&rope, &cursor), &rope);
        assert_eq!(hidden(&set, src), vec!["*", "*"]);
        assert!(set.hides().all(|s| s.from >= 12));
    }

    #[test]
    fn test_only_visible_quote_lines_decorated() {
        let src = "> one\n> two\n> three\n\nend";
        let rope = EditorRope::from_str(src);
        let tree = SyntaxTree::parse(src);
        let viewport = Viewport::new(vec![6..11]);
        let config = EngineConfig::default();
        let mut builder = DecorationBuilder::new();
        Walker::new(&rope, &tree, &viewport, &config, &()).walk(&mut builder);
        let cursor = CursorState::new(src.len());
        let set = builder.finish_inline(&VisibilityState::calculate(&rope, &cursor), &rope);
        let lines: Vec<&str> = set.line_classes().map(|(s, _)| &src[s.range()]).collect();
        assert_eq!(lines, vec!["> two"]);
    }

    #[test]
    fn test_unterminated_and_diagram_fences_untouched() {
        let src = "```rust\nfn main() {}";
        assert!(walk(src, 0).is_empty());

        let src = "```mermaid\ngraph TD\n```\n\nx";
        assert!(walk(src, src.len()).is_empty());
    }

    #[test]
    fn test_no_double_decoration() {
        let src = "[**bold** link](https://a.io) and `*not em*`\nx";
        let set = walk(src, src.len());
        for (widget_span, _) in set.widgets() {
            assert!(
                set.hides()
                    .all(|h| h.to <= widget_span.from || h.from >= widget_span.to),
                "hide overlaps widget"
            );
        }
        assert!(set.iter().all(|s| !matches!(s.kind, SpanKind::Mark(ref c) if c == "md-em")));
    }

    #[test]
    fn test_language_labels() {
        assert_eq!(language_label("rs"), "Rust");
        assert_eq!(language_label("py"), "Python");
        assert_eq!(language_label("nonsense-lang"), "nonsense-lang");
        assert_eq!(fence_language("rust ignore"), Some("rust"));
        assert_eq!(fence_language(""), None);
    }

    #[test]
    fn test_link_text_end() {
        assert_eq!(link_text_end("[a [b] c](u)"), Some(8));
        assert_eq!(link_text_end(r"[a \] b](u)"), Some(7));
        assert_eq!(link_text_end("[open"), None);
    }
}
