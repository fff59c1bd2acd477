use colored::Color;
use once_cell::sync::Lazy;

/// Terminal palette for the immerse client.
pub struct ColorTheme {
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub primary: Color,
    pub secondary: Color,
    pub key: Color,
    pub value: Color,
}

impl ColorTheme {
    /// Magenta accents on the usual status colors.
    fn immerse() -> Self {
        Self {
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
            highlight: Color::BrightMagenta,
            muted: Color::BrightBlack,
            primary: Color::Magenta,
            secondary: Color::BrightWhite,
            key: Color::BrightMagenta,
            value: Color::White,
        }
    }
}

pub static THEME: Lazy<ColorTheme> = Lazy::new(ColorTheme::immerse);

/// Glyphs for message prefixes and the per-viewer post status column.
pub mod icons {
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const WARNING: &str = "⚠";
    pub const INFO: &str = "ℹ";
    pub const ARROW: &str = "→";
    pub const BULLET: &str = "•";

    pub const LIKED: &str = "♥";
    pub const FLAGGED: &str = "⚑";
    pub const STAR: &str = "★";
    pub const WITHHELD: &str = "⊘";
}
