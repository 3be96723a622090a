//! Widgets that stand in for markdown source, and the containers they mount
//! into.
//!
//! A widget's identity is its value: two widgets built from the same source
//! compare equal, so the host can keep an already-mounted element (and any
//! asynchronous rendering in progress) across rebuilds.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use markdown_weaver_escape::{escape_href, escape_html};
use smol_str::SmolStr;

use crate::renderer::Theme;
use crate::table::{Alignment, TableData};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Widget {
    /// Task list checkbox. `offset` is the byte offset of the `[` in `[ ]`.
    Checkbox { checked: bool, offset: usize },
    Bullet { depth: u8, glyph: SmolStr },
    Rule,
    Link {
        text: SmolStr,
        url: SmolStr,
        favicon: Option<SmolStr>,
    },
    Image { alt: SmolStr, url: SmolStr },
    /// Header shown above a fenced code block, with a copy button.
    CodeHeader {
        language: Option<SmolStr>,
        label: SmolStr,
        code: String,
    },
    Emoji { code: SmolStr, glyph: SmolStr },
    FootnoteRef { id: SmolStr, number: usize },
    FootnoteLabel { id: SmolStr, number: usize },
    Table(TableData),
    Math { source: String, display: bool },
    Diagram { source: String, theme: Theme },
}

impl Widget {
    /// Short name used in class names and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Widget::Checkbox { .. } => "checkbox",
            Widget::Bullet { .. } => "bullet",
            Widget::Rule => "rule",
            Widget::Link { .. } => "link",
            Widget::Image { .. } => "image",
            Widget::CodeHeader { .. } => "code-header",
            Widget::Emoji { .. } => "emoji",
            Widget::FootnoteRef { .. } => "footnote-ref",
            Widget::FootnoteLabel { .. } => "footnote-label",
            Widget::Table(_) => "table",
            Widget::Math { .. } => "math",
            Widget::Diagram { .. } => "diagram",
        }
    }

    /// HTML for widgets that render without outside help. Math and diagram
    /// widgets return `None`; they are rendered when mounted.
    pub fn static_html(&self) -> Option<String> {
        let mut out = String::new();
        match self {
            Widget::Checkbox { checked, offset } => {
                let _ = write!(
                    out,
                    r#"<input type="checkbox" class="md-task-checkbox" data-offset="{offset}"{}>"#,
                    if *checked { " checked" } else { "" }
                );
            }
            Widget::Bullet { depth, glyph } => {
                let _ = write!(out, r#"<span class="md-bullet md-bullet-depth-{depth}">"#);
                let _ = escape_html(&mut out, glyph);
                out.push_str("</span>");
            }
            Widget::Rule => out.push_str(r#"<hr class="md-rule">"#),
            Widget::Link { text, url, favicon } => {
                out.push_str(r#"<a class="md-link-chip" href=""#);
                let _ = escape_href(&mut out, url);
                out.push_str(r#"" target="_blank" rel="noopener">"#);
                if let Some(favicon) = favicon {
                    out.push_str(r#"<img class="md-favicon" src=""#);
                    let _ = escape_href(&mut out, favicon);
                    out.push_str(r#"" alt="">"#);
                }
                let _ = escape_html(&mut out, if text.is_empty() { url } else { text });
                out.push_str("</a>");
            }
            Widget::Image { alt, url } => {
                out.push_str(r#"<img class="md-image" src=""#);
                let _ = escape_href(&mut out, url);
                out.push_str(r#"" alt=""#);
                let _ = escape_html(&mut out, alt);
                out.push_str(r#"">"#);
            }
            Widget::CodeHeader { label, code, .. } => {
                out.push_str(r#"<div class="md-code-header"><span class="md-code-lang">"#);
                let _ = escape_html(&mut out, label);
                out.push_str(r#"</span><button class="md-code-copy" data-code=""#);
                let _ = escape_html(&mut out, code);
                out.push_str(r#"">Copy</button></div>"#);
            }
            Widget::Emoji { code, glyph } => {
                out.push_str(r#"<span class="md-emoji" title=":"#);
                let _ = escape_html(&mut out, code);
                out.push_str(r#":">"#);
                let _ = escape_html(&mut out, glyph);
                out.push_str("</span>");
            }
            Widget::FootnoteRef { id, number } => {
                out.push_str(r#"<sup class="md-footnote-ref" data-footnote=""#);
                let _ = escape_html(&mut out, id);
                let _ = write!(out, r#"">{number}</sup>"#);
            }
            Widget::FootnoteLabel { id, number } => {
                out.push_str(r#"<span class="md-footnote-label" data-footnote=""#);
                let _ = escape_html(&mut out, id);
                let _ = write!(out, r#"">{number}.</span>"#);
            }
            Widget::Table(table) => table_html(&mut out, table),
            Widget::Math { .. } | Widget::Diagram { .. } => return None,
        }
        Some(out)
    }
}

fn table_html(out: &mut String, table: &TableData) {
    fn cell(out: &mut String, tag: &str, text: &str, align: Alignment) {
        match align.as_css() {
            Some(align) => {
                let _ = write!(out, r#"<{tag} style="text-align: {align}">"#);
            }
            None => {
                let _ = write!(out, "<{tag}>");
            }
        }
        let _ = escape_html(&mut *out, text);
        let _ = write!(out, "</{tag}>");
    }

    out.push_str(r#"<table class="md-table"><thead><tr>"#);
    for (i, header) in table.headers.iter().enumerate() {
        cell(out, "th", header, table.alignment(i));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for (i, text) in row.iter().enumerate() {
            cell(out, "td", text, table.alignment(i));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerState {
    pub class: SmolStr,
    pub html: String,
    /// Waiting for an asynchronous renderer.
    pub pending: bool,
    pub error: Option<String>,
}

/// A mounted widget's element, shared between the host and any pending
/// render.
#[derive(Debug, Clone, Default)]
pub struct Container(Rc<RefCell<ContainerState>>);

/// Handle held by asynchronous renders. Writing through it after the host
/// dropped the container does nothing.
#[derive(Debug, Clone)]
pub struct WeakContainer(Weak<RefCell<ContainerState>>);

impl Container {
    pub fn filled(class: impl Into<SmolStr>, html: String) -> Self {
        Self(Rc::new(RefCell::new(ContainerState {
            class: class.into(),
            html,
            pending: false,
            error: None,
        })))
    }

    pub fn pending(class: impl Into<SmolStr>) -> Self {
        Self(Rc::new(RefCell::new(ContainerState {
            class: class.into(),
            html: String::new(),
            pending: true,
            error: None,
        })))
    }

    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer(Rc::downgrade(&self.0))
    }

    pub fn class(&self) -> SmolStr {
        self.0.borrow().class.clone()
    }

    pub fn html(&self) -> String {
        self.0.borrow().html.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.0.borrow().pending
    }

    pub fn error(&self) -> Option<String> {
        self.0.borrow().error.clone()
    }

    pub fn snapshot(&self) -> ContainerState {
        self.0.borrow().clone()
    }

    pub fn fill(&self, html: String) {
        let mut state = self.0.borrow_mut();
        state.html = html;
        state.pending = false;
    }

    /// Mark the container failed: it takes the error class and shows the
    /// message next to the escaped raw source.
    pub fn fail(&self, class: impl Into<SmolStr>, message: &str, source: &str) {
        let mut html = String::new();
        html.push_str(r#"<span class="md-widget-error-message">"#);
        let _ = escape_html(&mut html, message);
        html.push_str("</span><pre><code>");
        let _ = escape_html(&mut html, source);
        html.push_str("</code></pre>");

        let mut state = self.0.borrow_mut();
        state.class = class.into();
        state.html = html;
        state.pending = false;
        state.error = Some(message.to_string());
    }
}

impl WeakContainer {
    /// Returns false when the container is gone.
    pub fn fill(&self, html: String) -> bool {
        match self.0.upgrade() {
            Some(state) => {
                Container(state).fill(html);
                true
            }
            None => false,
        }
    }

    pub fn fail(&self, class: impl Into<SmolStr>, message: &str, source: &str) -> bool {
        match self.0.upgrade() {
            Some(state) => {
                Container(state).fail(class, message, source);
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}
