//! Favorability gauge

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, Gauge, Widget},
};

use crate::ui::theme::GameTheme;

/// Heart gauge for the current favorability
pub struct FavorabilityGauge<'a> {
    value: u8,
    theme: &'a GameTheme,
}

impl<'a> FavorabilityGauge<'a> {
    pub fn new(value: u8, theme: &'a GameTheme) -> Self {
        Self { value, theme }
    }
}

impl Widget for FavorabilityGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let color = self.theme.love_color(self.value);
        Gauge::default()
            .block(
                Block::default()
                    .title(" ♥ Favorability ")
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style(false)),
            )
            .gauge_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .percent(u16::from(self.value.min(100)))
            .label(format!("{}/100", self.value))
            .render(area, buf);
    }
}
