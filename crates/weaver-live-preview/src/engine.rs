//! `LivePreview`: the engine the host drives.
//!
//! The host reports what changed after each transaction; the engine rebuilds
//! the affected layers and hands back the new decoration sets. Widgets are
//! mounted on demand, and any asynchronous rendering they need goes through
//! the host's [`Spawn`] implementation.

use bitflags::bitflags;
use smol_str::format_smolstr;

use crate::autocomplete::{Autocomplete, CandidateStore};
use crate::config::EngineConfig;
use crate::decoration::DecorationSet;
use crate::host::{LinkPreview, Spawn, TaskToggle};
use crate::layers::{DocumentIndex, View, build_block_layer, build_inline_layer};
use crate::math::math_error_html;
use crate::renderer::{RendererService, Theme};
use crate::text::TextBuffer;
use crate::tree::SyntaxTree;
use crate::types::{CursorState, TextEdit, Viewport};
use crate::widget::{Container, Widget};

bitflags! {
    /// What a host transaction touched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Change: u8 {
        const DOC = 1 << 0;
        const SELECTION = 1 << 1;
        const VIEWPORT = 1 << 2;
    }
}

impl Change {
    /// Changes the inline layer rebuilds for.
    pub const INLINE: Change = Change::all();
    /// Changes the block layer rebuilds for. It covers the whole document,
    /// so scrolling alone never touches it.
    pub const BLOCK: Change = Change::DOC.union(Change::SELECTION);
}

/// The host's editor state at the time of an update.
#[derive(Clone, Copy)]
pub struct EditorState<'a> {
    pub text: &'a dyn TextBuffer,
    pub tree: &'a SyntaxTree,
    pub cursor: &'a CursorState,
    pub viewport: &'a Viewport,
}

/// Which layers an update replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Refresh {
    pub inline: bool,
    pub block: bool,
}

impl Refresh {
    pub fn any(&self) -> bool {
        self.inline || self.block
    }
}

pub struct LivePreview {
    config: EngineConfig,
    renderer: RendererService,
    spawner: Box<dyn Spawn>,
    task_toggle: Box<dyn TaskToggle>,
    link_preview: Box<dyn LinkPreview>,
    /// Footnote numbers and formula ranges for the current document.
    index: DocumentIndex,
    inline: DecorationSet,
    block: DecorationSet,
    /// Changes owed to the next update, e.g. after a theme switch.
    pending: Change,
}

impl LivePreview {
    pub fn new(config: EngineConfig, spawner: impl Spawn + 'static) -> Self {
        Self {
            config,
            renderer: RendererService::default(),
            spawner: Box::new(spawner),
            task_toggle: Box::new(()),
            link_preview: Box::new(()),
            index: DocumentIndex::default(),
            inline: DecorationSet::default(),
            block: DecorationSet::default(),
            pending: Change::all(),
        }
    }

    pub fn with_renderer(mut self, renderer: RendererService) -> Self {
        self.renderer = renderer;
        self.pending |= Change::BLOCK;
        self
    }

    pub fn with_task_toggle(mut self, toggle: impl TaskToggle + 'static) -> Self {
        self.task_toggle = Box::new(toggle);
        self
    }

    pub fn with_link_preview(mut self, preview: impl LinkPreview + 'static) -> Self {
        self.link_preview = Box::new(preview);
        self.pending |= Change::INLINE;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn renderer(&self) -> &RendererService {
        &self.renderer
    }

    pub fn theme(&self) -> Theme {
        self.renderer.theme()
    }

    /// An autocomplete sharing this engine's config and reading `store`.
    pub fn autocomplete(&self, store: CandidateStore) -> Autocomplete {
        Autocomplete::new(&self.config, store)
    }

    pub fn inline_layer(&self) -> &DecorationSet {
        &self.inline
    }

    pub fn block_layer(&self) -> &DecorationSet {
        &self.block
    }

    fn view<'a>(&'a self, state: &EditorState<'a>, index: &'a DocumentIndex) -> View<'a> {
        View {
            text: state.text,
            tree: state.tree,
            index,
            cursor: state.cursor,
            viewport: state.viewport,
            config: &self.config,
            theme: self.renderer.theme(),
            link_preview: self.link_preview.as_ref(),
        }
    }

    /// Build the inline layer for `state` without storing it.
    pub fn build_inline_layer(&self, state: &EditorState<'_>) -> DecorationSet {
        let index = DocumentIndex::build(state.text, state.tree);
        build_inline_layer(&self.view(state, &index))
    }

    /// Build the block layer for `state` without storing it.
    pub fn build_block_layer(&self, state: &EditorState<'_>) -> DecorationSet {
        let index = DocumentIndex::build(state.text, state.tree);
        build_block_layer(&self.view(state, &index))
    }

    /// Rebuild the layers `change` affects. A layer only counts as
    /// refreshed when its new set differs from the stored one.
    pub fn update(&mut self, change: Change, state: &EditorState<'_>) -> Refresh {
        let change = change | std::mem::replace(&mut self.pending, Change::empty());
        let mut refresh = Refresh::default();

        if change.contains(Change::DOC) {
            self.index = DocumentIndex::build(state.text, state.tree);
        }
        if change.intersects(Change::INLINE) {
            let inline = build_inline_layer(&self.view(state, &self.index));
            if inline != self.inline {
                self.inline = inline;
                refresh.inline = true;
            }
        }
        if change.intersects(Change::BLOCK) {
            let block = build_block_layer(&self.view(state, &self.index));
            if block != self.block {
                self.block = block;
                refresh.block = true;
            }
        }

        tracing::trace!(
            target: "weaver::live_preview::engine",
            ?change,
            inline = self.inline.len(),
            block = self.block.len(),
            refreshed_inline = refresh.inline,
            refreshed_block = refresh.block,
            "update"
        );
        refresh
    }

    /// Create the element for a widget. Static widgets come back filled;
    /// formulas render synchronously; diagrams come back pending and are
    /// filled once the renderer finishes.
    pub fn mount(&self, widget: &Widget) -> Container {
        let class = format_smolstr!("md-widget md-{}", widget.kind_name());
        if let Some(html) = widget.static_html() {
            return Container::filled(class, html);
        }
        match widget {
            Widget::Math { source, display } => {
                let mode = if *display { "md-math-display" } else { "md-math-inline" };
                match self.renderer.render_formula(source, *display) {
                    Ok(html) => Container::filled(format_smolstr!("{class} {mode}"), html),
                    Err(err) => {
                        tracing::warn!(
                            target: "weaver::live_preview::engine",
                            error = %err,
                            "formula render failed"
                        );
                        let delim = if *display { "$$" } else { "$" };
                        let raw = format!("{delim}{source}{delim}");
                        Container::filled(
                            format_smolstr!("md-math-error {mode}"),
                            math_error_html(&raw, &err.to_string(), *display),
                        )
                    }
                }
            }
            Widget::Diagram { source, theme } => {
                let container = Container::pending(class);
                if let Some(render) = self.renderer.mount_diagram(source, *theme, &container) {
                    self.spawner.spawn_local(render);
                }
                container
            }
            other => {
                // Every other widget has static HTML.
                tracing::warn!(
                    target: "weaver::live_preview::engine",
                    kind = other.kind_name(),
                    "widget without markup"
                );
                Container::filled(class, String::new())
            }
        }
    }

    /// Flip the task marker whose `[` sits at `offset`. Returns the edit to
    /// apply, or `None` when there is no marker there. The host's
    /// [`TaskToggle`] hears about every toggle.
    pub fn toggle_task(&self, text: &dyn TextBuffer, offset: usize) -> Option<TextEdit> {
        let marker = offset.checked_add(3).map(|end| text.slice(offset..end));
        let checked = match marker.as_deref() {
            Some("[ ]") => false,
            Some("[x]" | "[X]") => true,
            _ => {
                tracing::debug!(
                    target: "weaver::live_preview::engine",
                    offset,
                    "no task marker at offset"
                );
                return None;
            }
        };
        let now_checked = !checked;
        self.task_toggle.toggle(offset, now_checked);
        Some(TextEdit {
            range: offset + 1..offset + 2,
            insert: if now_checked { "x" } else { " " }.to_string(),
        })
    }

    /// Switch theme. The renderer service and its diagram cache are
    /// re-initialised, and the next update rebuilds the block layer.
    pub fn set_theme(&mut self, theme: Theme) {
        if theme == self.renderer.theme() {
            return;
        }
        self.renderer.set_theme(theme);
        self.pending |= Change::BLOCK;
    }

    /// Tear down: release cached renders and drop both layers.
    pub fn destroy(&mut self) {
        self.renderer.destroy();
        self.index = DocumentIndex::default();
        self.inline = DecorationSet::default();
        self.block = DecorationSet::default();
        self.pending = Change::all();
        tracing::debug!(target: "weaver::live_preview::engine", "destroyed");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use futures_util::future::{self, FutureExt, LocalBoxFuture};

    use super::*;
    use crate::error::RenderError;
    use crate::text::EditorRope;

    struct Doc {
        rope: EditorRope,
        tree: SyntaxTree,
        cursor: CursorState,
        viewport: Viewport,
    }

    impl Doc {
        fn new(source: &str, cursor: usize) -> Self {
            Self {
                rope: EditorRope::from_str(source),
                tree: SyntaxTree::parse(source),
                cursor: CursorState::new(cursor),
                viewport: Viewport::full(source.len()),
            }
        }

        fn state(&self) -> EditorState<'_> {
            EditorState {
                text: &self.rope,
                tree: &self.tree,
                cursor: &self.cursor,
                viewport: &self.viewport,
            }
        }
    }

    fn drop_spawner() -> impl Spawn {
        |_future: LocalBoxFuture<'static, ()>| {}
    }

    #[test]
    fn test_change_routing() {
        let doc = Doc::new("**a**\n\n$$x$$\n", 0);
        let mut engine = LivePreview::new(EngineConfig::default(), drop_spawner());
        let first = engine.update(Change::DOC, &doc.state());
        assert!(first.inline && first.block);

        // Nothing moved: both layers are rebuilt but unchanged.
        assert_eq!(engine.update(Change::all(), &doc.state()), Refresh::default());

        // Scrolling never rebuilds the block layer.
        let moved = Doc::new("**a**\n\n$$x$$\n", 8);
        let refresh = engine.update(Change::VIEWPORT, &moved.state());
        assert!(!refresh.block);
        assert_eq!(engine.block_layer().len(), 1);

        let refresh = engine.update(Change::SELECTION, &moved.state());
        assert!(refresh.block && !refresh.inline);
        assert!(engine.block_layer().is_empty());
    }

    #[test]
    fn test_mount_static_and_math() {
        let engine = LivePreview::new(EngineConfig::default(), drop_spawner());
        let checkbox = engine.mount(&Widget::Checkbox {
            checked: true,
            offset: 2,
        });
        assert_eq!(checkbox.class(), "md-widget md-checkbox");
        assert!(checkbox.html().contains("checked"));
        assert!(!checkbox.is_pending());

        let math = engine.mount(&Widget::Math {
            source: "x^2".into(),
            display: true,
        });
        assert_eq!(math.class(), "md-widget md-math md-math-display");
        assert!(math.html().contains("</math>"));
    }

    #[test]
    fn test_mount_math_failure_keeps_source() {
        struct Broken;
        impl crate::renderer::FormulaRenderer for Broken {
            fn render(&self, _source: &str, _display: bool) -> Result<String, RenderError> {
                Err(RenderError::Formula("unbalanced braces".into()))
            }
        }
        let engine = LivePreview::new(EngineConfig::default(), drop_spawner())
            .with_renderer(RendererService::default().with_formula_renderer(Broken));
        let math = engine.mount(&Widget::Math {
            source: "\\frac{a".into(),
            display: false,
        });
        assert_eq!(math.class(), "md-math-error md-math-inline");
        assert!(math.html().contains("<code>$\\frac{a$</code>"));
        assert!(math.html().contains("unbalanced braces"));
    }

    #[test]
    fn test_toggle_task() {
        let toggled = Rc::new(RefCell::new(Vec::new()));
        struct Recorder(Rc<RefCell<Vec<(usize, bool)>>>);
        impl TaskToggle for Recorder {
            fn toggle(&self, offset: usize, checked: bool) {
                self.0.borrow_mut().push((offset, checked));
            }
        }
        let engine = LivePreview::new(EngineConfig::default(), drop_spawner())
            .with_task_toggle(Recorder(toggled.clone()));
        let mut rope = EditorRope::from_str("- [ ] milk\n- [x] eggs\n");

        let edit = engine.toggle_task(&rope, 2).unwrap();
        assert_eq!(edit, TextEdit { range: 3..4, insert: "x".into() });
        rope.apply(&edit);
        assert_eq!(rope.to_string(), "- [x] milk\n- [x] eggs\n");

        let edit = engine.toggle_task(&rope, 13).unwrap();
        assert_eq!(edit.insert, " ");
        assert_eq!(engine.toggle_task(&rope, 0), None);
        assert_eq!(*toggled.borrow(), vec![(2, true), (13, false)]);
    }

    #[test]
    fn test_toggle_task_off_char_boundary() {
        let engine = LivePreview::new(EngineConfig::default(), drop_spawner());
        let rope = EditorRope::from_str("ab€cd");
        assert_eq!(engine.toggle_task(&rope, 0), None);
        assert_eq!(engine.toggle_task(&rope, 2), None);
        assert_eq!(engine.toggle_task(&rope, 3), None);
        assert_eq!(engine.toggle_task(&rope, usize::MAX), None);
    }

    #[test]
    fn test_footnote_numbers_follow_edits() {
        let number_of = |engine: &LivePreview, id: &str| {
            engine.inline_layer().widgets().find_map(|(_, w)| match w {
                Widget::FootnoteRef { id: found, number } if found == id => Some(*number),
                _ => None,
            })
        };
        let src = "a[^x]\n\n[^x]: n\n";
        let doc = Doc::new(src, src.len());
        let mut engine = LivePreview::new(EngineConfig::default(), drop_spawner());
        engine.update(Change::DOC, &doc.state());
        assert_eq!(number_of(&engine, "x"), Some(1));

        // Moving the cursor keeps the cached numbering.
        let moved = Doc::new(src, src.len() - 1);
        engine.update(Change::SELECTION, &moved.state());
        assert_eq!(number_of(&engine, "x"), Some(1));

        let src = "a[^y] b[^x]\n\n[^x]: n\n[^y]: m\n";
        let doc = Doc::new(src, src.len());
        engine.update(Change::DOC, &doc.state());
        assert_eq!(number_of(&engine, "y"), Some(1));
        assert_eq!(number_of(&engine, "x"), Some(2));
    }

    #[test]
    fn test_theme_switch_rebuilds_block_layer() {
        let doc = Doc::new("```mermaid\ngraph TD\n```\n\nend", 27);
        let mut engine = LivePreview::new(EngineConfig::default(), drop_spawner());
        engine.update(Change::DOC, &doc.state());
        assert_eq!(
            engine.block_layer().spans()[0].widget(),
            Some(&Widget::Diagram {
                source: "graph TD".into(),
                theme: Theme::Light
            })
        );

        engine.set_theme(Theme::Dark);
        let refresh = engine.update(Change::VIEWPORT, &doc.state());
        assert!(refresh.block);
        assert_eq!(
            engine.block_layer().spans()[0].widget(),
            Some(&Widget::Diagram {
                source: "graph TD".into(),
                theme: Theme::Dark
            })
        );
    }

    #[tokio::test]
    async fn test_diagram_fills_async_and_keeps_identity() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let calls = Rc::new(Cell::new(0));
                let counter = calls.clone();
                let renderer = RendererService::new(Theme::Light).with_diagram_renderer(
                    move |source: &str, _theme: Theme| {
                        counter.set(counter.get() + 1);
                        let svg = format!("<svg>{}</svg>", source.len());
                        future::ready(Ok::<_, RenderError>(svg)).boxed_local()
                    },
                );
                let spawner = |future: LocalBoxFuture<'static, ()>| {
                    tokio::task::spawn_local(future);
                };
                let mut engine =
                    LivePreview::new(EngineConfig::default(), spawner).with_renderer(renderer);

                let src = "intro\n\n```mermaid\ngraph TD\n```\n";
                let doc = Doc::new(src, 0);
                engine.update(Change::DOC, &doc.state());
                let (_, widget) = engine.block_layer().widgets().next().unwrap();
                let widget = widget.clone();

                let container = engine.mount(&widget);
                assert!(container.is_pending());
                while container.is_pending() {
                    tokio::task::yield_now().await;
                }
                assert_eq!(container.html(), "<svg>8</svg>");
                assert_eq!(container.class(), "md-widget md-diagram");

                // An edit elsewhere leaves the diagram widget equal, so the
                // host keeps its mounted element.
                let doc = Doc::new("intro, edited\n\n```mermaid\ngraph TD\n```\n", 0);
                let refresh = engine.update(Change::DOC, &doc.state());
                assert!(refresh.block);
                let (_, after) = engine.block_layer().widgets().next().unwrap();
                assert_eq!(after, &widget);

                // A second mount is served from the cache.
                let again = engine.mount(after);
                while again.is_pending() {
                    tokio::task::yield_now().await;
                }
                assert_eq!(again.html(), container.html());
                assert_eq!(calls.get(), 1);

                engine.destroy();
                assert_eq!(engine.renderer().diagrams().cache_len(), 0);
                assert!(engine.block_layer().is_empty());
            })
            .await;
    }

    #[test]
    fn test_missing_diagram_renderer() {
        let engine = LivePreview::new(EngineConfig::default(), drop_spawner());
        let container = engine.mount(&Widget::Diagram {
            source: "graph TD".into(),
            theme: Theme::Light,
        });
        assert_eq!(container.class(), "md-diagram-error");
        assert!(container.error().is_some());
        assert!(container.html().contains("graph TD"));
    }
}
