//! Choice card list

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use lovesim_core::Choice;

use crate::ui::theme::GameTheme;

/// Numbered list of the player's choices
pub struct ChoicesWidget<'a> {
    choices: &'a [Choice],
    selected: usize,
    theme: &'a GameTheme,
    enabled: bool,
}

impl<'a> ChoicesWidget<'a> {
    pub fn new(choices: &'a [Choice], theme: &'a GameTheme) -> Self {
        Self {
            choices,
            selected: 0,
            theme,
            enabled: true,
        }
    }

    pub fn selected(mut self, selected: usize) -> Self {
        self.selected = selected;
        self
    }

    /// Disabled choices are dimmed, e.g. while dialogue is still typing.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for ChoicesWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Your answer ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.enabled));

        let lines: Vec<Line> = self
            .choices
            .iter()
            .enumerate()
            .map(|(i, choice)| {
                let style = if !self.enabled {
                    Style::default().add_modifier(Modifier::DIM)
                } else if i == self.selected {
                    self.theme.selected_style()
                } else {
                    self.theme.player_style()
                };
                let marker = if i == self.selected { "▶" } else { " " };
                Line::from(vec![
                    Span::styled(format!("{marker} {}. ", i + 1), style),
                    Span::styled(choice.text.as_str(), style),
                ])
            })
            .collect();

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
