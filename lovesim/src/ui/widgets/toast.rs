//! Transient notifications

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::app::Toast;
use crate::ui::theme::GameTheme;

/// Stack of active toasts, newest last
pub struct ToastWidget<'a> {
    toasts: &'a [Toast],
    theme: &'a GameTheme,
}

impl<'a> ToastWidget<'a> {
    pub fn new(toasts: &'a [Toast], theme: &'a GameTheme) -> Self {
        Self { toasts, theme }
    }

    /// Rows needed to draw every toast.
    pub fn height(&self) -> u16 {
        if self.toasts.is_empty() {
            0
        } else {
            self.toasts.len() as u16 + 2
        }
    }
}

impl Widget for ToastWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.toasts.is_empty() {
            return;
        }
        Clear.render(area, buf);

        let lines: Vec<Line> = self
            .toasts
            .iter()
            .map(|t| Line::from(Span::styled(t.message.as_str(), self.theme.toast_style(t.kind))))
            .collect();

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style(true)),
            )
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
