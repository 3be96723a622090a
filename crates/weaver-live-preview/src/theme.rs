use smol_str::SmolStr;

use crate::renderer::Theme;

/// Colours, fonts and spacing for the decorated editor, with one colour
/// scheme per [`Theme`].
#[derive(Debug, Clone)]
pub struct EditorStyle {
    pub light: ColorScheme,
    pub dark: ColorScheme,
    pub fonts: FontScheme,
    pub spacing: SpacingScheme,
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub base: SmolStr,
    pub surface: SmolStr,
    pub text: SmolStr,
    pub muted: SmolStr,
    pub subtle: SmolStr,
    pub primary: SmolStr,
    pub secondary: SmolStr,
    pub link: SmolStr,
    pub highlight: SmolStr,
    pub border: SmolStr,
    pub error: SmolStr,
    pub success: SmolStr,
}

#[derive(Debug, Clone)]
pub struct FontScheme {
    pub body: SmolStr,
    pub heading: SmolStr,
    pub monospace: SmolStr,
}

#[derive(Debug, Clone)]
pub struct SpacingScheme {
    pub base_font_size: SmolStr,
    pub line_height: SmolStr,
    pub scale: SmolStr,
}

impl EditorStyle {
    pub fn scheme(&self, theme: Theme) -> &ColorScheme {
        match theme {
            Theme::Light => &self.light,
            Theme::Dark => &self.dark,
        }
    }
}

impl Default for EditorStyle {
    fn default() -> Self {
        Self {
            light: ColorScheme::dawn(),
            dark: ColorScheme::night(),
            fonts: FontScheme::default(),
            spacing: SpacingScheme::default(),
        }
    }
}

impl ColorScheme {
    /// Rose Pine Dawn.
    pub fn dawn() -> Self {
        Self {
            base: SmolStr::new("#faf4ed"),
            surface: SmolStr::new("#fffaf3"),
            text: SmolStr::new("#575279"),
            muted: SmolStr::new("#9893a5"),
            subtle: SmolStr::new("#797593"),
            primary: SmolStr::new("#907aa9"),
            secondary: SmolStr::new("#56949f"),
            link: SmolStr::new("#286983"),
            highlight: SmolStr::new("#f6c177"),
            border: SmolStr::new("#dfdad9"),
            error: SmolStr::new("#b4637a"),
            success: SmolStr::new("#286983"),
        }
    }

    /// Rose Pine.
    pub fn night() -> Self {
        Self {
            base: SmolStr::new("#191724"),
            surface: SmolStr::new("#1f1d2e"),
            text: SmolStr::new("#e0def4"),
            muted: SmolStr::new("#6e6a86"),
            subtle: SmolStr::new("#908caa"),
            primary: SmolStr::new("#c4a7e7"),
            secondary: SmolStr::new("#9ccfd8"),
            link: SmolStr::new("#31748f"),
            highlight: SmolStr::new("#524f67"),
            border: SmolStr::new("#403d52"),
            error: SmolStr::new("#eb6f92"),
            success: SmolStr::new("#9ccfd8"),
        }
    }
}

impl Default for FontScheme {
    fn default() -> Self {
        Self {
            body: SmolStr::new(
                "IBM Plex, system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif",
            ),
            heading: SmolStr::new(concat!(
                "IBM Plex Sans, system-ui, -apple-system, BlinkMacSystemFont, ",
                "'Segoe UI', sans-serif"
            )),
            monospace: SmolStr::new(concat!(
                "'IBM Plex Mono', 'Berkeley Mono', 'Cascadia Code', 'Roboto Mono', ",
                "Consolas, monospace"
            )),
        }
    }
}

impl Default for SpacingScheme {
    fn default() -> Self {
        Self {
            base_font_size: SmolStr::new("16px"),
            line_height: SmolStr::new("1.6"),
            scale: SmolStr::new("1.25"),
        }
    }
}
