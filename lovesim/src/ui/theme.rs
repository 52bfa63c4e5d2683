//! Color theme and styling for the Love Simulator TUI

use ratatui::style::{Color, Modifier, Style};

use crate::app::ToastKind;

/// Game UI color theme
#[derive(Debug, Clone)]
pub struct GameTheme {
    // Base colors
    pub border: Color,
    pub border_focused: Color,

    // Favorability colors
    pub love_high: Color,
    pub love_mid: Color,
    pub love_low: Color,
    pub love_critical: Color,

    // Text colors
    pub character_text: Color,
    pub player_text: Color,
    pub system_text: Color,
    pub highlight: Color,

    // Toast colors
    pub toast_info: Color,
    pub toast_success: Color,
    pub toast_warning: Color,
    pub toast_error: Color,
    pub toast_achievement: Color,
}

impl Default for GameTheme {
    fn default() -> Self {
        Self {
            border: Color::DarkGray,
            border_focused: Color::LightMagenta,

            love_high: Color::LightMagenta,
            love_mid: Color::LightGreen,
            love_low: Color::Yellow,
            love_critical: Color::Red,

            character_text: Color::White,
            player_text: Color::LightCyan,
            system_text: Color::DarkGray,
            highlight: Color::LightMagenta,

            toast_info: Color::LightBlue,
            toast_success: Color::LightGreen,
            toast_warning: Color::LightYellow,
            toast_error: Color::LightRed,
            toast_achievement: Color::Yellow,
        }
    }
}

impl GameTheme {
    /// Get style for the character's dialogue
    pub fn character_style(&self) -> Style {
        Style::default().fg(self.character_text)
    }

    /// Get style for the player's choices and input
    pub fn player_style(&self) -> Style {
        Style::default().fg(self.player_text)
    }

    /// Get style for system messages
    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    /// Get style for the highlighted list entry
    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    }

    /// Get favorability gauge color for a 0..=100 value
    pub fn love_color(&self, favorability: u8) -> Color {
        if favorability >= 80 {
            self.love_high
        } else if favorability >= 50 {
            self.love_mid
        } else if favorability >= 30 {
            self.love_low
        } else {
            self.love_critical
        }
    }

    pub fn toast_style(&self, kind: ToastKind) -> Style {
        let color = match kind {
            ToastKind::Info => self.toast_info,
            ToastKind::Success => self.toast_success,
            ToastKind::Warning => self.toast_warning,
            ToastKind::Error => self.toast_error,
            ToastKind::Achievement => self.toast_achievement,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Get title style
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_love_color_bands() {
        let theme = GameTheme::default();
        assert_eq!(theme.love_color(100), theme.love_high);
        assert_eq!(theme.love_color(50), theme.love_mid);
        assert_eq!(theme.love_color(30), theme.love_low);
        assert_eq!(theme.love_color(29), theme.love_critical);
    }
}
