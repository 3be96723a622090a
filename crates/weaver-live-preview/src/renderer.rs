//! Renderer service: the injected diagram and formula renderers plus the
//! current theme.
//!
//! The service is owned by the engine. Changing the theme re-creates the
//! diagram cache, since every rendered diagram depends on it.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use futures_util::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

use crate::error::RenderError;
use crate::math::LatexRenderer;
use crate::resolver::{AssetHandle, AssetResolver};
use crate::widget::Container;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

/// Renders diagram source (e.g. mermaid) to SVG markup.
pub trait DiagramRenderer {
    fn render(
        &self,
        source: &str,
        theme: Theme,
    ) -> LocalBoxFuture<'static, Result<String, RenderError>>;
}

/// Renders a LaTeX formula to markup synchronously.
pub trait FormulaRenderer {
    fn render(&self, source: &str, display: bool) -> Result<String, RenderError>;
}

impl<F> DiagramRenderer for F
where
    F: Fn(&str, Theme) -> LocalBoxFuture<'static, Result<String, RenderError>>,
{
    fn render(
        &self,
        source: &str,
        theme: Theme,
    ) -> LocalBoxFuture<'static, Result<String, RenderError>> {
        self(source, theme)
    }
}

/// A rendered diagram held in the diagram cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramSvg(pub Rc<str>);

impl AssetHandle for DiagramSvg {
    fn release(&self) {
        tracing::trace!(
            target: "weaver::live_preview::renderer",
            bytes = self.0.len(),
            "released diagram"
        );
    }
}

pub struct RendererService {
    theme: Theme,
    formula: Rc<dyn FormulaRenderer>,
    diagram: Option<Rc<dyn DiagramRenderer>>,
    diagrams: AssetResolver<DiagramSvg>,
}

impl Default for RendererService {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl RendererService {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            formula: Rc::new(LatexRenderer),
            diagram: None,
            diagrams: AssetResolver::new(),
        }
    }

    pub fn with_formula_renderer(mut self, renderer: impl FormulaRenderer + 'static) -> Self {
        self.formula = Rc::new(renderer);
        self
    }

    pub fn with_diagram_renderer(mut self, renderer: impl DiagramRenderer + 'static) -> Self {
        self.diagram = Some(Rc::new(renderer));
        self
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switch theme. Cached diagrams were rendered for the old theme, so the
    /// diagram cache is torn down and started fresh.
    pub fn set_theme(&mut self, theme: Theme) {
        if theme == self.theme {
            return;
        }
        tracing::debug!(target: "weaver::live_preview::renderer", %theme, "theme changed");
        self.theme = theme;
        self.diagrams.destroy();
        self.diagrams = AssetResolver::new();
    }

    pub fn diagrams(&self) -> &AssetResolver<DiagramSvg> {
        &self.diagrams
    }

    pub fn render_formula(&self, source: &str, display: bool) -> Result<String, RenderError> {
        self.formula.render(source, display)
    }

    /// Start rendering a diagram into `container`. The returned future must
    /// be spawned; without a diagram renderer the container fails at once
    /// and `None` is returned.
    pub fn mount_diagram(
        &self,
        source: &str,
        theme: Theme,
        container: &Container,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        let Some(renderer) = self.diagram.clone() else {
            let err = RenderError::NoRenderer("diagram");
            container.fail("md-diagram-error", &err.to_string(), source);
            return None;
        };
        let key = diagram_key(source, theme);
        let owned = source.to_string();
        let fetch_source = owned.clone();
        Some(self.diagrams.attach(
            key,
            container,
            move || {
                renderer
                    .render(&fetch_source, theme)
                    .map(|result| result.map(|svg| DiagramSvg(svg.into())))
                    .boxed_local()
            },
            |svg| svg.0.to_string(),
            "md-diagram-error",
            owned,
        ))
    }

    pub fn destroy(&self) {
        self.diagrams.destroy();
    }
}

fn diagram_key(source: &str, theme: Theme) -> SmolStr {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    format_smolstr!("{theme}:{:016x}", hasher.finish())
}
