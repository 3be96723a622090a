//! Math: `$$…$$` / `$…$` detection and LaTeX rendering via pulldown-latex → MathML

use std::ops::Range;
use std::sync::LazyLock;

use markdown_weaver_escape::escape_html;
use pulldown_latex::{
    Parser, Storage, config::DisplayMode, config::RenderConfig, mathml::push_mathml,
};
use regex::Regex;

use crate::error::RenderError;
use crate::renderer::FormulaRenderer;

static DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$").expect("valid display math regex"));

static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([^\s$](?:[^$\n]*[^\s$])?)\$").expect("valid inline math regex")
});

/// A math expression located in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathMatch {
    /// Range including the delimiters.
    pub range: Range<usize>,
    /// LaTeX source without delimiters.
    pub source: String,
    pub display: bool,
}

/// Find math in `source`: display math across the whole text first, then
/// inline math outside the display ranges. `skip` reports offsets inside
/// code.
pub fn find_math(source: &str, skip: impl Fn(usize) -> bool) -> Vec<MathMatch> {
    let mut found: Vec<MathMatch> = Vec::new();

    for caps in DISPLAY_MATH.captures_iter(source) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if skip(whole.start()) || is_escaped(source, whole.start()) {
            continue;
        }
        let latex = inner.as_str().trim();
        if latex.is_empty() {
            continue;
        }
        found.push(MathMatch {
            range: whole.range(),
            source: latex.to_string(),
            display: true,
        });
    }

    let display_count = found.len();
    for caps in INLINE_MATH.captures_iter(source) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let range = whole.range();
        let covered = found[..display_count]
            .iter()
            .any(|m| range.start < m.range.end && m.range.start < range.end);
        if covered || skip(range.start) || is_escaped(source, range.start) {
            continue;
        }
        // `$5 and $6` style prices: a digit right after the closing `$`.
        if source[range.end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
        {
            continue;
        }
        found.push(MathMatch {
            range,
            source: inner.as_str().to_string(),
            display: false,
        });
    }

    found.sort_by_key(|m| m.range.start);
    found
}

fn is_escaped(source: &str, offset: usize) -> bool {
    source[..offset].ends_with('\\')
}

/// Default formula renderer: LaTeX to MathML.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexRenderer;

impl FormulaRenderer for LatexRenderer {
    fn render(&self, latex: &str, display: bool) -> Result<String, RenderError> {
        render_math(latex, display)
    }
}

/// Render LaTeX math to MathML
///
/// # Arguments
/// * `latex` - The LaTeX source string (without delimiters like $ or $$)
/// * `display_mode` - If true, render as display math (block); if false, inline
pub fn render_math(latex: &str, display_mode: bool) -> Result<String, RenderError> {
    let storage = Storage::new();
    let parser = Parser::new(latex, &storage);
    let config = RenderConfig {
        display_mode: if display_mode {
            DisplayMode::Block
        } else {
            DisplayMode::Inline
        },
        ..Default::default()
    };

    let events: Vec<_> = parser.collect();
    let errors: Vec<String> = events
        .iter()
        .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
        .collect();
    if !errors.is_empty() {
        return Err(RenderError::Formula(errors.join("; ")));
    }

    let mut mathml = String::new();
    push_mathml(&mut mathml, events.into_iter(), config)
        .map_err(|e| RenderError::Formula(e.to_string()))?;
    Ok(mathml)
}

/// Fallback shown when a formula fails: the raw delimited source, with the
/// error as a tooltip.
pub fn math_error_html(raw: &str, error: &str, display: bool) -> String {
    let mode_class = if display {
        "md-math-display"
    } else {
        "md-math-inline"
    };
    let mut escaped_raw = String::new();
    let mut escaped_error = String::new();
    let _ = escape_html(&mut escaped_raw, raw);
    let _ = escape_html(&mut escaped_error, error);
    format!(
        "<span class=\"md-math md-math-error {mode_class}\" title=\"{escaped_error}\">\
         <code>{escaped_raw}</code></span>"
    )
}
