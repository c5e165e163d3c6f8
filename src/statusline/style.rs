//! ANSI styling for statusline segments.

use crossterm::style::{Color, Stylize};

/// Foreground tone of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Green,
    Yellow,
    Red,
    Cyan,
    Magenta,
    Dim,
}

impl Tone {
    fn color(self) -> Option<Color> {
        match self {
            Self::Green => Some(Color::Green),
            Self::Yellow => Some(Color::Yellow),
            Self::Red => Some(Color::Red),
            Self::Cyan => Some(Color::Cyan),
            Self::Magenta => Some(Color::Magenta),
            Self::Dim => None,
        }
    }
}

/// Wrap `text` in ANSI codes for `tone`, or return it unchanged when colors
/// are disabled.
#[must_use]
pub fn paint(text: &str, tone: Tone, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    match tone.color() {
        Some(color) => text.with(color).to_string(),
        None => text.dim().to_string(),
    }
}
