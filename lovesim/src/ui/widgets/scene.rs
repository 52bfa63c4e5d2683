//! Dialogue panel for the current scene

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::GameTheme;

/// Shows the character's line as revealed so far
pub struct SceneWidget<'a> {
    character: &'a str,
    text: &'a str,
    mood: Option<&'a str>,
    theme: &'a GameTheme,
    typing: bool,
    paused: bool,
    animation_frame: u8,
}

impl<'a> SceneWidget<'a> {
    pub fn new(character: &'a str, text: &'a str, theme: &'a GameTheme) -> Self {
        Self {
            character,
            text,
            mood: None,
            theme,
            typing: false,
            paused: false,
            animation_frame: 0,
        }
    }

    pub fn mood(mut self, mood: Option<&'a str>) -> Self {
        self.mood = mood;
        self
    }

    /// Whether more text is still to come.
    pub fn typing(mut self, typing: bool, animation_frame: u8) -> Self {
        self.typing = typing;
        self.animation_frame = animation_frame;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

impl Widget for SceneWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.mood {
            Some(mood) => format!(" {} ({mood}) ", self.character),
            None => format!(" {} ", self.character),
        };
        let block = Block::default()
            .title(Span::styled(title, self.theme.title_style()))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(!self.paused));

        let mut spans = vec![Span::styled(
            format!("\"{}", self.text),
            self.theme.character_style(),
        )];
        if self.typing {
            // Blinking cursor
            if self.animation_frame % 4 < 2 {
                spans.push(Span::styled("▌", self.theme.character_style()));
            }
        } else if !self.text.is_empty() {
            spans.push(Span::styled("\"", self.theme.character_style()));
        }

        let mut lines = vec![Line::from(""), Line::from(spans)];
        if self.paused {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "⏸ Paused (p to resume)",
                self.theme.system_style().add_modifier(Modifier::BOLD),
            )));
        }

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .render(area, buf);
    }
}
