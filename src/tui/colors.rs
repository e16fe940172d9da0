//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::QuadrantType;

/// Do Now accent
pub const DO_NOW_GREEN: Color = Color::Rgb(0x16, 0x65, 0x34);
/// Do Later accent
pub const DO_LATER_BLUE: Color = Color::Rgb(0x1e, 0x40, 0xaf);
/// Delegate accent
pub const DELEGATE_AMBER: Color = Color::Rgb(0x85, 0x4d, 0x0e);
/// Eliminate accent
pub const ELIMINATE_RED: Color = Color::Rgb(0x99, 0x1b, 0x1b);

/// Suggestion bar highlight
pub const SUGGESTION_BLUE: Color = Color::Rgb(37, 99, 235);

/// Accent color for a quadrant's border and selection.
pub fn accent(quadrant: QuadrantType) -> Color {
    match quadrant {
        QuadrantType::DoNow => DO_NOW_GREEN,
        QuadrantType::DoLater => DO_LATER_BLUE,
        QuadrantType::Delegate => DELEGATE_AMBER,
        QuadrantType::Eliminate => ELIMINATE_RED,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn accents_match_quadrant_config() {
        for q in QuadrantType::ALL {
            assert_eq!(Color::from_str(q.config().accent).unwrap(), accent(q));
        }
    }
}
