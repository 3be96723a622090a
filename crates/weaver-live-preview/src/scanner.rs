//! Line scanner for constructs the markdown parser doesn't model.
//!
//! Each visible line runs through a fixed sequence of regex passes: hashtags,
//! highlight, superscript, subscript, emoji shortcodes, footnote references,
//! footnote definitions, definition lists and bare URLs. A match whose start
//! lies inside code or a formula is never decorated.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use smol_str::SmolStr;
use url::Url;

use crate::config::EngineConfig;
use crate::decoration::{Condition, DecorationBuilder};
use crate::emoji;
use crate::host::LinkPreview;
use crate::table::line_spans;
use crate::text::TextBuffer;
use crate::tree::in_ranges;
use crate::widget::Widget;

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[\p{L}_][\p{L}\p{N}_\-/]*").expect("valid hashtag regex"));
static HIGHLIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==([^=\n]+?)==").expect("valid highlight regex"));
static SUPERSCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^([^\^\s\[\]]+)\^").expect("valid superscript regex"));
static SUBSCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~([^~\s]+)~").expect("valid subscript regex"));
static EMOJI_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([a-zA-Z0-9_+\-]+):").expect("valid emoji regex"));
static FOOTNOTE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\^([^\]\s]+)\]").expect("valid footnote regex"));
static FOOTNOTE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:\s").expect("valid footnote def regex"));
static DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:\s+").expect("valid definition regex"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("valid url regex"));

/// Footnote numbers, assigned in order of first appearance in the document.
/// References and the definition of the same id share a number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FootnoteIndex {
    numbers: HashMap<SmolStr, usize>,
}

impl FootnoteIndex {
    /// Number every reference and definition in `source`, skipping
    /// offsets for which `skip` holds.
    pub fn collect(source: &str, skip: impl Fn(usize) -> bool) -> Self {
        let mut index = Self::default();
        for (start, line) in line_spans(source) {
            let defines = FOOTNOTE_DEF.is_match(line);
            for caps in FOOTNOTE_REF.captures_iter(line) {
                let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let definition = defines && whole.start() == 0;
                if skip(start + whole.start())
                    || (!definition && line[whole.end()..].starts_with(':'))
                {
                    continue;
                }
                index.number(id.as_str());
            }
        }
        index
    }

    pub fn number(&mut self, id: &str) -> usize {
        let next = self.numbers.len() + 1;
        *self.numbers.entry(SmolStr::new(id)).or_insert(next)
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.numbers.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

pub struct Scanner<'a> {
    text: &'a dyn TextBuffer,
    /// Code and formula ranges, sorted and disjoint.
    excluded: &'a [Range<usize>],
    /// Link and image syntax; URLs inside belong to the link.
    links: &'a [Range<usize>],
    footnotes: &'a FootnoteIndex,
    config: &'a EngineConfig,
    link_preview: &'a dyn LinkPreview,
}

impl<'a> Scanner<'a> {
    pub fn new(
        text: &'a dyn TextBuffer,
        excluded: &'a [Range<usize>],
        footnotes: &'a FootnoteIndex,
        config: &'a EngineConfig,
        link_preview: &'a dyn LinkPreview,
    ) -> Self {
        Self {
            text,
            excluded,
            links: &[],
            footnotes,
            config,
            link_preview,
        }
    }

    pub fn with_links(mut self, links: &'a [Range<usize>]) -> Self {
        self.links = links;
        self
    }

    /// Scan the given line indices, in order.
    pub fn scan_lines(
        &self,
        builder: &mut DecorationBuilder,
        lines: impl IntoIterator<Item = usize>,
    ) {
        for index in lines {
            self.scan_line(builder, index);
        }
    }

    pub fn scan_line(&self, builder: &mut DecorationBuilder, index: usize) {
        if index >= self.text.len_lines() {
            return;
        }
        let range = self.text.line_range(index);
        let text = self.text.slice(range.clone());
        let line = text.as_ref();
        if line.is_empty() {
            return;
        }
        // A line that starts inside a fenced block belongs to the block.
        if self.excluded(range.start) && !line.trim_start().starts_with('`') {
            return;
        }

        self.hashtags(builder, range.start, line);
        self.symmetric(builder, range.start, line, &HIGHLIGHT, 2, "md-highlight");
        self.superscript(builder, range.start, line);
        self.subscript(builder, range.start, line);
        self.emoji(builder, range.start, line);
        self.footnote_refs(builder, range.start, line);
        self.footnote_def(builder, range.clone(), line);
        self.definition(builder, index, range.clone(), line);
        self.urls(builder, range.start, line);
    }

    fn excluded(&self, offset: usize) -> bool {
        in_ranges(self.excluded, offset)
    }

    fn hashtags(&self, builder: &mut DecorationBuilder, base: usize, line: &str) {
        for m in HASHTAG.find_iter(line) {
            let start = base + m.start();
            if self.excluded(start) {
                continue;
            }
            let preceded = line[..m.start()].chars().next_back();
            if preceded
                .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '#' | '&' | '/'))
            {
                continue;
            }
            // Trailing separators belong to the sentence, not the tag.
            let tag = m.as_str().trim_end_matches(['-', '/']);
            builder.mark(start..start + tag.len(), "md-hashtag");
        }
    }

    /// Paired markers of `width` bytes around inner text.
    fn symmetric(
        &self,
        builder: &mut DecorationBuilder,
        base: usize,
        line: &str,
        pattern: &Regex,
        width: usize,
        class: &'static str,
    ) {
        for caps in pattern.captures_iter(line) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let construct = base + whole.start()..base + whole.end();
            if self.excluded(construct.start) {
                continue;
            }
            let inner = base + inner.start()..base + inner.end();
            self.emit_symmetric(builder, construct, inner, width, class);
        }
    }

    fn emit_symmetric(
        &self,
        builder: &mut DecorationBuilder,
        construct: Range<usize>,
        inner: Range<usize>,
        width: usize,
        class: &'static str,
    ) {
        builder.hide(construct.start..construct.start + width, construct.clone());
        builder.hide(construct.end - width..construct.end, construct.clone());
        builder.mark(inner, class);
    }

    fn superscript(&self, builder: &mut DecorationBuilder, base: usize, line: &str) {
        for caps in SUPERSCRIPT.captures_iter(line) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // The caret of a footnote reference `[^id]`.
            if line[..whole.start()].ends_with('[') {
                continue;
            }
            let construct = base + whole.start()..base + whole.end();
            if self.excluded(construct.start) {
                continue;
            }
            let inner = base + inner.start()..base + inner.end();
            self.emit_symmetric(builder, construct, inner, 1, "md-sup");
        }
    }

    fn subscript(&self, builder: &mut DecorationBuilder, base: usize, line: &str) {
        for caps in SUBSCRIPT.captures_iter(line) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // `~~strike~~` is strikethrough, handled by the tree walker.
            if line[..whole.start()].ends_with('~') || line[whole.end()..].starts_with('~') {
                continue;
            }
            let construct = base + whole.start()..base + whole.end();
            if self.excluded(construct.start) {
                continue;
            }
            let inner = base + inner.start()..base + inner.end();
            self.emit_symmetric(builder, construct, inner, 1, "md-sub");
        }
    }

    fn emoji(&self, builder: &mut DecorationBuilder, base: usize, line: &str) {
        for caps in EMOJI_CODE.captures_iter(line) {
            let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let range = base + whole.start()..base + whole.end();
            if self.excluded(range.start) {
                continue;
            }
            let Some(glyph) = emoji::lookup(code.as_str()) else {
                continue;
            };
            let widget = Widget::Emoji {
                code: SmolStr::new(code.as_str()),
                glyph: SmolStr::new_static(glyph),
            };
            builder.replace(range.clone(), widget, range);
        }
    }

    fn footnote_refs(&self, builder: &mut DecorationBuilder, base: usize, line: &str) {
        for caps in FOOTNOTE_REF.captures_iter(line) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if line[whole.end()..].starts_with(':') {
                continue;
            }
            let range = base + whole.start()..base + whole.end();
            if self.excluded(range.start) {
                continue;
            }
            let Some(number) = self.footnotes.get(id.as_str()) else {
                tracing::trace!(
                    target: "weaver::live_preview::scanner",
                    id = id.as_str(),
                    "footnote missing from index"
                );
                continue;
            };
            let widget = Widget::FootnoteRef {
                id: SmolStr::new(id.as_str()),
                number,
            };
            builder.replace(range.clone(), widget, range.clone());
            builder.mark_when(range.clone(), "md-footnote-ref", Condition::WhenRevealed(range));
        }
    }

    fn footnote_def(&self, builder: &mut DecorationBuilder, line_range: Range<usize>, line: &str) {
        let Some(caps) = FOOTNOTE_DEF.captures(line) else {
            return;
        };
        let Some(id) = caps.get(1) else {
            return;
        };
        if self.excluded(line_range.start) {
            return;
        }
        let Some(number) = self.footnotes.get(id.as_str()) else {
            return;
        };
        // `[^id]:` without the whitespace that follows it.
        let label = line_range.start..line_range.start + id.end() + 2;
        builder.replace(
            label,
            Widget::FootnoteLabel {
                id: SmolStr::new(id.as_str()),
                number,
            },
            line_range.clone(),
        );
        builder.line_class(line_range, "md-footnote-def");
    }

    fn definition(
        &self,
        builder: &mut DecorationBuilder,
        index: usize,
        line_range: Range<usize>,
        line: &str,
    ) {
        let Some(m) = DEFINITION.find(line) else {
            return;
        };
        if self.excluded(line_range.start) {
            return;
        }
        let Some(term) = (0..index)
            .rev()
            .map(|i| self.text.line_range(i))
            .find(|r| !self.text.slice(r.clone()).trim().is_empty())
        else {
            return;
        };
        builder.hide(line_range.start..line_range.start + m.end(), line_range.clone());
        builder.line_class(line_range, "md-definition");
        builder.line_class(term, "md-definition-term");
    }

    fn urls(&self, builder: &mut DecorationBuilder, base: usize, line: &str) {
        for m in BARE_URL.find_iter(line) {
            let start = base + m.start();
            // Destinations and autolinks are decorated by the link itself.
            if self.excluded(start) || self.links.iter().any(|link| link.contains(&start)) {
                continue;
            }
            let url_text = trim_url(m.as_str());
            let range = start..start + url_text.len();
            let url = match Url::parse(url_text) {
                Ok(url) if self.config.is_web_scheme(url.scheme()) => url,
                _ => {
                    builder.mark(range, "md-url");
                    continue;
                }
            };
            let widget = Widget::Link {
                text: SmolStr::new(url_text),
                url: SmolStr::new(url_text),
                favicon: self.link_preview.favicon_url(&url),
            };
            builder.replace(range.clone(), widget, range.clone());
            builder.mark_when(range.clone(), "md-url", Condition::WhenRevealed(range));
        }
    }
}

/// Strip trailing punctuation from a bare URL. A trailing `)` stays when
/// the rest of the URL opens more parentheses than it closes.
pub fn trim_url(url: &str) -> &str {
    let mut end = url.len();
    loop {
        let Some(last) = url[..end].chars().next_back() else {
            break;
        };
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '*' | '_' | '~' | '\'' | '"' => end -= 1,
            ')' => {
                let rest = &url[..end - 1];
                let opens = rest.matches('(').count();
                let closes = rest.matches(')').count();
                if opens > closes {
                    break;
                }
                end -= 1;
            }
            _ => break,
        }
    }
    &url[..end]
}

/// Classes the scanner emits.
pub const SCANNER_CLASSES: &[&str] = &[
    "md-hashtag",
    "md-highlight",
    "md-sup",
    "md-sub",
    "md-footnote-ref",
    "md-footnote-def",
    "md-definition",
    "md-definition-term",
    "md-url",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::DecorationSet;
    use crate::text::EditorRope;
    use crate::tree::{NodeKind, SyntaxTree};
    use crate::types::CursorState;
    use crate::visibility::VisibilityState;

    fn scan_lines(
        source: &str,
        code: &[Range<usize>],
        cursor: usize,
        lines: Range<usize>,
    ) -> (DecorationSet, FootnoteIndex) {
        let rope = EditorRope::from_str(source);
        let tree = SyntaxTree::parse(source);
        let links: Vec<Range<usize>> = tree
            .iter()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Link { .. } | NodeKind::Image { .. }))
            .map(|(_, n)| n.range.clone())
            .collect();
        let footnotes = FootnoteIndex::collect(source, |offset| in_ranges(code, offset));
        let config = EngineConfig::default();
        let scanner = Scanner::new(&rope, code, &footnotes, &config, &()).with_links(&links);
        let mut builder = DecorationBuilder::new();
        scanner.scan_lines(&mut builder, lines);
        let vis = VisibilityState::calculate(&rope, &CursorState::new(cursor));
        (builder.finish_inline(&vis, &rope), footnotes)
    }

    fn scan(source: &str, code: &[Range<usize>], cursor: usize) -> (DecorationSet, FootnoteIndex) {
        let lines = EditorRope::from_str(source).len_lines();
        scan_lines(source, code, cursor, 0..lines)
    }

    fn marks(set: &DecorationSet, source: &str, class: &str) -> Vec<String> {
        set.marks()
            .filter(|(_, c)| *c == class)
            .map(|(s, _)| source[s.range()].to_string())
            .collect()
    }

    #[test]
    fn test_hashtags() {
        let src = "x\nBuy milk #errand and #home/kitchen, \
                   not a#b or https://a.io/#frag or ## heading\n";
        let (set, _) = scan(src, &[], 0);
        assert_eq!(marks(&set, src, "md-hashtag"), vec!["#errand", "#home/kitchen"]);
    }

    #[test]
    fn test_hashtag_in_code_skipped() {
        let src = "x\nsee `#notatag` and #tag\n";
        let (set, _) = scan(src, &[6..16], 0);
        assert_eq!(marks(&set, src, "md-hashtag"), vec!["#tag"]);
    }

    #[test]
    fn test_highlight_sup_sub() {
        let src = "x\n==hi== E=mc^2^ H~2~O ~~gone~~\n";
        let (set, _) = scan(src, &[], 0);
        assert_eq!(marks(&set, src, "md-highlight"), vec!["hi"]);
        assert_eq!(marks(&set, src, "md-sup"), vec!["2"]);
        assert_eq!(marks(&set, src, "md-sub"), vec!["2"]);
        let hidden: Vec<&str> = set.hides().map(|s| &src[s.range()]).collect();
        assert_eq!(hidden, vec!["==", "==", "^", "^", "~", "~"]);

        // On the cursor line the markers stay visible, the marks remain.
        let (set, _) = scan(src, &[], 3);
        assert_eq!(set.hides().count(), 0);
        assert_eq!(marks(&set, src, "md-highlight"), vec!["hi"]);
    }

    #[test]
    fn test_emoji() {
        let src = "x\nparty :tada: at 10:30:00 :nope:\n";
        let (set, _) = scan(src, &[], 0);
        let widgets: Vec<_> =
            set.widgets().map(|(s, w)| (&src[s.range()], w.clone())).collect();
        assert_eq!(
            widgets,
            vec![(
                ":tada:",
                Widget::Emoji {
                    code: "tada".into(),
                    glyph: "🎉".into()
                }
            )]
        );
    }

    #[test]
    fn test_footnotes_share_numbers() {
        let src = "x\nFirst[^b] then[^a] and [^b] again.\n\n[^a]: Alpha\n[^b]: Beta\n";
        let (set, footnotes) = scan(src, &[], 0);
        assert_eq!(footnotes.get("b"), Some(1));
        assert_eq!(footnotes.get("a"), Some(2));

        let numbers: Vec<(String, usize)> = set
            .widgets()
            .filter_map(|(_, w)| match w {
                Widget::FootnoteRef { id, number } => Some((format!("ref:{id}"), *number)),
                Widget::FootnoteLabel { id, number } => Some((format!("def:{id}"), *number)),
                _ => None,
            })
            .collect();
        assert_eq!(
            numbers,
            vec![
                ("ref:b".to_string(), 1),
                ("ref:a".to_string(), 2),
                ("ref:b".to_string(), 1),
                ("def:a".to_string(), 2),
                ("def:b".to_string(), 1),
            ]
        );
        let label = set
            .widgets()
            .find(|(_, w)| matches!(w, Widget::FootnoteLabel { .. }))
            .map(|(s, _)| &src[s.range()]);
        assert_eq!(label, Some("[^a]:"));
        assert_eq!(set.line_classes().filter(|(_, c)| *c == "md-footnote-def").count(), 2);
    }

    #[test]
    fn test_footnote_numbers_ignore_scroll_position() {
        let src = "First[^b] then[^a]\n\n[^a]: Alpha\n[^b]: Beta\n";
        let label = |set: &DecorationSet| {
            set.widgets().find_map(|(_, w)| match w {
                Widget::FootnoteLabel { id, number } if id == "a" => Some(*number),
                _ => None,
            })
        };
        let (whole, _) = scan(src, &[], 100);
        assert_eq!(label(&whole), Some(2));
        // Only the definitions in view.
        let (scrolled, _) = scan_lines(src, &[], 100, 2..4);
        assert_eq!(label(&scrolled), Some(2));
    }

    #[test]
    fn test_footnotes_in_code_not_numbered() {
        let src = "`[^x]` then[^y]\n\n[^y]: Why\n";
        let (_, footnotes) = scan(src, &[0..6], 100);
        assert_eq!(footnotes.get("x"), None);
        assert_eq!(footnotes.get("y"), Some(1));
    }

    #[test]
    fn test_footnote_label_with_wide_space() {
        let src = "[^a]:\u{a0}note\n";
        let (set, _) = scan(src, &[], 100);
        let label = set
            .widgets()
            .find(|(_, w)| matches!(w, Widget::FootnoteLabel { .. }))
            .map(|(s, _)| s.range());
        assert_eq!(label, Some(0..5));
    }

    #[test]
    fn test_definition_list() {
        let src = "Term\n:   The definition\n";
        let (set, _) = scan(src, &[], 100);
        let lines: Vec<(&str, &str)> = set
            .line_classes()
            .map(|(s, c)| (&src[s.range()], c))
            .collect();
        assert_eq!(
            lines,
            vec![("Term", "md-definition-term"), (":   The definition", "md-definition")]
        );
        let hidden: Vec<&str> = set.hides().map(|s| &src[s.range()]).collect();
        assert_eq!(hidden, vec![":   "]);
    }

    #[test]
    fn test_bare_urls() {
        let src = "x\nSee https://example.com/a. \
                   Or (https://en.wikipedia.org/wiki/Rust_(language)) \
                   and [x](https://skip.me) or <https://auto.link>\n";
        let (set, _) = scan(src, &[], 0);
        let urls: Vec<&str> = set
            .widgets()
            .filter_map(|(_, w)| match w {
                Widget::Link { url, .. } => Some(url.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            urls,
            vec!["https://example.com/a", "https://en.wikipedia.org/wiki/Rust_(language)"]
        );
    }

    #[test]
    fn test_trim_url() {
        assert_eq!(trim_url("https://a.io/x."), "https://a.io/x");
        assert_eq!(trim_url("https://a.io/x)"), "https://a.io/x");
        assert_eq!(trim_url("https://a.io/Rust_(lang)"), "https://a.io/Rust_(lang)");
        assert_eq!(trim_url("https://a.io/Rust_(lang))."), "https://a.io/Rust_(lang)");
    }

    #[test]
    fn test_url_revealed_on_cursor_line() {
        let src = "x\nhttps://example.com\n";
        let (set, _) = scan(src, &[], 4);
        assert_eq!(set.widgets().count(), 0);
        assert_eq!(marks(&set, src, "md-url"), vec!["https://example.com"]);
    }
}
