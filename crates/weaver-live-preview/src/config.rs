//! Engine configuration.
//!
//! Every field has a working default, so hosts only need to override what
//! they care about:
//!
//! ```ignore
//! let config = EngineConfig::from_json_str(r#"{ "diagram_language": "graph" }"#)?;
//! ```

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fence language that is rendered by the diagram renderer.
    pub diagram_language: SmolStr,
    /// Deepest list nesting level that gets its own style.
    pub max_list_depth: u8,
    /// Deepest blockquote nesting level that gets its own style.
    pub max_quote_depth: u8,
    /// Bullet glyphs indexed by list depth (wraps around).
    pub bullet_glyphs: Vec<SmolStr>,
    /// URI schemes that link and image widgets render. Anything else is
    /// left for host extensions.
    pub web_schemes: Vec<SmolStr>,
    /// Schemes an image target may use to become an inline image widget.
    pub image_schemes: Vec<SmolStr>,
    /// How far back from the cursor autocomplete looks for a trigger, in bytes.
    pub autocomplete_lookback: usize,
    /// Maximum number of suggestions offered at once.
    pub max_suggestions: usize,
    /// Characters that must follow `:` before emoji suggestions open.
    pub emoji_min_query: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            diagram_language: SmolStr::new_static("mermaid"),
            max_list_depth: 4,
            max_quote_depth: 3,
            bullet_glyphs: ["•", "◦", "▪", "▫"]
                .into_iter()
                .map(SmolStr::new_static)
                .collect(),
            web_schemes: ["http", "https", "mailto"]
                .into_iter()
                .map(SmolStr::new_static)
                .collect(),
            image_schemes: ["http", "https"]
                .into_iter()
                .map(SmolStr::new_static)
                .collect(),
            autocomplete_lookback: 32,
            max_suggestions: 20,
            emoji_min_query: 2,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diagram_language.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "diagram_language must not be empty".into(),
            ));
        }
        if self.max_list_depth == 0 || self.max_quote_depth == 0 {
            return Err(ConfigError::Invalid(
                "nesting depth limits must be at least 1".into(),
            ));
        }
        if self.bullet_glyphs.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one bullet glyph is required".into(),
            ));
        }
        if self.autocomplete_lookback == 0 {
            return Err(ConfigError::Invalid(
                "autocomplete_lookback must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Bullet glyph for a 1-based list depth.
    pub fn bullet_for_depth(&self, depth: u8) -> &str {
        let index = (depth.max(1) as usize - 1) % self.bullet_glyphs.len().max(1);
        self.bullet_glyphs
            .get(index)
            .map(SmolStr::as_str)
            .unwrap_or("•")
    }

    pub fn is_web_scheme(&self, scheme: &str) -> bool {
        self.web_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }

    pub fn is_image_scheme(&self, scheme: &str) -> bool {
        self.image_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "diagram_language": "graph" }"#).unwrap();
        assert_eq!(config.diagram_language, "graph");
        assert_eq!(config.max_list_depth, 4);
        assert_eq!(config.max_quote_depth, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "bullet_glyphs": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bullet_glyph_wraps() {
        let config = EngineConfig::default();
        assert_eq!(config.bullet_for_depth(1), "•");
        assert_eq!(config.bullet_for_depth(2), "◦");
        assert_eq!(config.bullet_for_depth(5), "•");
    }

    #[test]
    fn test_scheme_checks() {
        let config = EngineConfig::default();
        assert!(config.is_web_scheme("HTTPS"));
        assert!(config.is_web_scheme("mailto"));
        assert!(!config.is_web_scheme("note"));
        assert!(!config.is_image_scheme("mailto"));
    }
}
