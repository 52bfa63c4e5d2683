//! Layout helpers

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen regions while a scene is showing
pub struct PlayLayout {
    pub header: Rect,
    pub scene: Rect,
    pub choices: Rect,
    pub status: Rect,
}

impl PlayLayout {
    pub fn calculate(area: Rect, choice_count: usize) -> Self {
        // One line per choice plus borders
        let choice_height = (choice_count as u16).max(1) + 2;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(choice_height),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            header: chunks[0],
            scene: chunks[1],
            choices: chunks[2],
            status: chunks[3],
        }
    }
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
