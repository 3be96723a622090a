//! weaver-live-preview: cursor-aware live markdown decorations.
//!
//! This crate provides:
//! - `TextBuffer` trait for host text access, with the ropey-backed `EditorRope`
//! - `SyntaxTree` built from the markdown parser's offset events
//! - Two decoration layers: inline (viewport, walker + scanner) and block
//!   (whole document: tables, math, diagrams)
//! - `LivePreview`, the engine the host drives with change flags
//! - Widgets, the renderer service and the shared asset resolver
//! - Mention, hashtag and emoji autocomplete
//!
//! Markers are hidden unless the cursor or a selection touches the lines a
//! construct spans; read-only views never reveal them. All offsets are UTF-8
//! byte offsets.

pub mod autocomplete;
pub mod config;
pub mod css;
pub mod decoration;
pub mod emoji;
pub mod engine;
pub mod error;
pub mod host;
pub mod layers;
pub mod math;
pub mod renderer;
pub mod resolver;
pub mod scanner;
pub mod table;
pub mod text;
pub mod theme;
pub mod tree;
pub mod types;
pub mod visibility;
pub mod walker;
pub mod widget;

pub use autocomplete::{
    Autocomplete, Candidate, CandidateStore, Candidates, CompletionItem, CompletionKind,
    CompletionResult, Trigger, TriggerKind, find_trigger,
};
pub use config::EngineConfig;
pub use css::generate_editor_css;
pub use decoration::{DecorationBuilder, DecorationSet, Span, SpanKind};
pub use engine::{Change, EditorState, LivePreview, Refresh};
pub use error::{ConfigError, RenderError, Result};
pub use host::{FaviconTemplate, LinkPreview, Spawn, TaskToggle};
pub use layers::{DocumentIndex, View, build_block_layer, build_inline_layer};
pub use math::LatexRenderer;
pub use renderer::{DiagramRenderer, FormulaRenderer, RendererService, Theme};
pub use resolver::{AssetHandle, AssetResolver};
pub use smol_str::SmolStr;
pub use table::{Alignment, TableData};
pub use text::{EditorRope, TextBuffer};
pub use theme::EditorStyle;
pub use tree::{NodeKind, SyntaxTree};
pub use types::{CursorState, Selection, TextEdit, Viewport};
pub use visibility::VisibilityState;
pub use widget::{Container, Widget};
