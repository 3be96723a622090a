//! Stylesheet for the classes the decoration layers emit.
//!
//! Hosts inject this once; the editor root carries `data-theme` and the
//! colour variables follow it.

use std::fmt::Write as _;

use crate::config::EngineConfig;
use crate::scanner::SCANNER_CLASSES;
use crate::theme::{ColorScheme, EditorStyle};

/// Classes with a fixed name that the stylesheet must cover. Depth and
/// level classes are generated from the config.
pub const STYLED_CLASSES: &[&str] = &[
    "md-em",
    "md-strong",
    "md-strike",
    "md-code",
    "md-heading",
    "md-list-item",
    "md-bullet",
    "md-task-checkbox",
    "md-task-done",
    "md-blockquote",
    "md-callout",
    "md-callout-title",
    "md-code-line",
    "md-code-header",
    "md-link-text",
    "md-link-chip",
    "md-favicon",
    "md-image",
    "md-rule",
    "md-emoji",
    "md-footnote-label",
    "md-table",
    "md-math",
    "md-math-display",
    "md-math-error",
    "md-diagram",
    "md-diagram-error",
    "md-widget-error-message",
];

fn color_vars(selector: &str, c: &ColorScheme) -> String {
    format!(
        r#"{selector} {{
    --md-color-base: {};
    --md-color-surface: {};
    --md-color-text: {};
    --md-color-muted: {};
    --md-color-subtle: {};
    --md-color-primary: {};
    --md-color-secondary: {};
    --md-color-link: {};
    --md-color-highlight: {};
    --md-color-border: {};
    --md-color-error: {};
    --md-color-success: {};
}}
"#,
        c.base,
        c.surface,
        c.text,
        c.muted,
        c.subtle,
        c.primary,
        c.secondary,
        c.link,
        c.highlight,
        c.border,
        c.error,
        c.success,
    )
}

pub fn generate_editor_css(style: &EditorStyle, config: &EngineConfig) -> String {
    let fonts = &style.fonts;
    let spacing = &style.spacing;

    let mut css = String::new();
    css.push_str("/* Colours - Light (default) */\n");
    css.push_str(&color_vars(".md-editor, .md-editor[data-theme=\"light\"]", &style.light));
    css.push_str("\n/* Colours - Dark */\n");
    css.push_str(&color_vars(".md-editor[data-theme=\"dark\"]", &style.dark));

    let _ = write!(
        css,
        r#"
.md-editor {{
    --md-font-body: {body};
    --md-font-heading: {heading};
    --md-font-mono: {mono};
    --md-spacing-base: {base};
    --md-spacing-line-height: {line_height};
    --md-spacing-scale: {scale};

    font-family: var(--md-font-body);
    font-size: var(--md-spacing-base);
    line-height: var(--md-spacing-line-height);
    color: var(--md-color-text);
    background: var(--md-color-base);
}}

/* Inline styling */
.md-em {{ font-style: italic; }}
.md-strong {{ font-weight: 700; }}
.md-strike {{ text-decoration: line-through; color: var(--md-color-muted); }}
.md-code {{
    font-family: var(--md-font-mono);
    background: var(--md-color-surface);
    padding: 0.125rem 0.25rem;
    border-radius: 4px;
    font-size: 0.9em;
}}
.md-highlight {{ background: var(--md-color-highlight); border-radius: 2px; }}
.md-sup {{ vertical-align: super; font-size: 0.75em; }}
.md-sub {{ vertical-align: sub; font-size: 0.75em; }}
.md-hashtag {{ color: var(--md-color-primary); }}
.md-url, .md-link-text {{ color: var(--md-color-link); text-decoration: underline; }}

/* Headings */
.md-heading {{
    font-family: var(--md-font-heading);
    line-height: 1.2;
}}
"#,
        body = fonts.body,
        heading = fonts.heading,
        mono = fonts.monospace,
        base = spacing.base_font_size,
        line_height = spacing.line_height,
        scale = spacing.scale,
    );

    let sizes = [
        (1, "2rem"),
        (2, "1.5rem"),
        (3, "1.25rem"),
        (4, "1.2rem"),
        (5, "1.125rem"),
        (6, "1rem"),
    ];
    for (level, size) in sizes {
        let color = if level % 2 == 0 { "primary" } else { "secondary" };
        let _ = writeln!(
            css,
            ".md-heading-{level} {{ font-size: {size}; color: var(--md-color-{color}); }}"
        );
    }

    css.push_str(
        r#"
/* Lists and tasks */
.md-list-item { padding-left: 0.25rem; }
.md-bullet { color: var(--md-color-subtle); display: inline-block; width: 1em; }
.md-task-checkbox { margin-right: 0.4em; vertical-align: middle; cursor: pointer; }
.md-task-done { color: var(--md-color-muted); text-decoration: line-through; }
"#,
    );
    for depth in 1..=config.max_list_depth {
        let _ = writeln!(
            css,
            ".md-list-depth-{depth} {{ padding-left: {:.2}rem; }}",
            depth as f32 * 1.5
        );
    }

    css.push_str(
        r#"
/* Quotes and callouts */
.md-blockquote {
    border-left: 2px solid var(--md-color-secondary);
    background: var(--md-color-surface);
    padding-left: 1rem;
    font-size: 0.95em;
}
.md-callout {
    border-left: 3px solid var(--md-color-primary);
    background: var(--md-color-surface);
    padding-left: 1rem;
}
.md-callout-title { font-weight: 600; color: var(--md-color-primary); }
.md-callout-warning, .md-callout-caution { border-left-color: var(--md-color-error); }
.md-callout-tip, .md-callout-important { border-left-color: var(--md-color-success); }
"#,
    );
    for depth in 1..=config.max_quote_depth {
        let _ = writeln!(
            css,
            ".md-quote-depth-{depth} {{ border-left-width: {}px; }}",
            u32::from(depth) * 2
        );
    }

    css.push_str(
        r#"
/* Code blocks */
.md-code-line {
    font-family: var(--md-font-mono);
    background: var(--md-color-surface);
    padding: 0 1rem;
    font-size: 0.9em;
}
.md-code-header {
    display: flex;
    justify-content: space-between;
    font-size: 0.8em;
    color: var(--md-color-subtle);
    background: var(--md-color-surface);
    border-bottom: 1px solid var(--md-color-border);
    padding: 0.25rem 1rem;
}

/* Inline widgets */
.md-link-chip {
    color: var(--md-color-link);
    text-decoration: none;
    border: 1px solid var(--md-color-border);
    border-radius: 4px;
    padding: 0 0.25rem;
}
.md-favicon { width: 1em; height: 1em; vertical-align: -0.125em; margin-right: 0.25em; }
.md-image { max-width: 100%; vertical-align: middle; }
.md-rule { border: none; border-top: 1px solid var(--md-color-border); margin: 0.75rem 0; }
.md-emoji { font-style: normal; }
.md-footnote-ref { font-size: 0.8em; vertical-align: super; color: var(--md-color-subtle); }
.md-footnote-label { font-size: 0.8em; color: var(--md-color-subtle); }
.md-footnote-def { font-size: 0.9em; }
.md-definition { padding-left: 1.5rem; }
.md-definition-term { font-weight: 600; }

/* Block widgets */
.md-table { border-collapse: collapse; display: block; overflow-x: auto; max-width: 100%; }
.md-table th, .md-table td { border: 1px solid var(--md-color-border); padding: 0.5rem; }
.md-table th { background: var(--md-color-surface); font-weight: 600; }
.md-math { font-family: var(--md-font-mono); }
.md-math-display { display: block; margin: 1rem 0; text-align: center; }
.md-diagram { display: block; text-align: center; min-height: 2rem; }
.md-diagram svg { max-width: 100%; }

/* Render failures keep the source visible */
.md-math-error, .md-diagram-error {
    color: var(--md-color-error);
    text-decoration: underline wavy;
    text-decoration-color: var(--md-color-error);
}
.md-diagram-error {
    text-decoration: none;
    border: 1px dashed var(--md-color-error);
    padding: 0.5rem;
}
.md-widget-error-message { display: block; font-size: 0.85em; margin-bottom: 0.25rem; }
"#,
    );

    tracing::trace!(target: "weaver::live_preview::css", bytes = css.len(), "generated editor css");
    css
}
