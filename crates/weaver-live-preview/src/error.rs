//! Error types for the live preview engine.

use miette::Diagnostic;
use thiserror::Error;

/// Failures of asynchronous or fallible widget rendering.
///
/// These never escape a rebuild: widgets convert them into an error display
/// that keeps the raw source visible.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RenderError {
    /// The formula renderer rejected the source.
    #[error("formula error: {0}")]
    #[diagnostic(code(weaver::live_preview::formula))]
    Formula(String),

    /// The diagram renderer rejected the source.
    #[error("diagram error: {0}")]
    #[diagnostic(code(weaver::live_preview::diagram))]
    Diagram(String),

    /// No renderer is configured for this kind of widget.
    #[error("no {0} renderer configured")]
    #[diagnostic(code(weaver::live_preview::no_renderer))]
    NoRenderer(&'static str),
}

/// Configuration loading errors.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error(transparent)]
    #[diagnostic(code(weaver::live_preview::config::parse))]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    #[diagnostic(
        code(weaver::live_preview::config::invalid),
        help("see EngineConfig::default() for working values")
    )]
    Invalid(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
