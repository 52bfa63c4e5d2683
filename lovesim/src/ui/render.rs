//! Render orchestration for the Love Simulator TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use lovesim_core::{SaveStore, ScenarioBackend};

use crate::app::{App, Screen};
use crate::ui::layout::{centered_rect_fixed, PlayLayout};
use crate::ui::widgets::{ChoicesWidget, FavorabilityGauge, InputWidget, SceneWidget, ToastWidget};

/// Overlay types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Leaderboard,
}

/// Main render function
pub fn render<B: ScenarioBackend, S: SaveStore>(frame: &mut Frame, app: &App<B, S>) {
    let area = frame.area();

    match app.screen {
        Screen::ScenarioSelect => render_scenario_select(frame, app, area),
        Screen::Playing => render_playing(frame, app, area),
        Screen::Result => render_result(frame, app, area),
    }

    match app.overlay {
        Some(Overlay::Help) => render_help_overlay(frame, app, area),
        Some(Overlay::Leaderboard) => render_leaderboard_overlay(frame, app, area),
        None => {}
    }

    render_toasts(frame, app, area);
}

fn render_scenario_select<B: ScenarioBackend, S: SaveStore>(
    frame: &mut Frame,
    app: &App<B, S>,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        "💕 Love Simulator 💕",
        app.theme.title_style(),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(title, chunks[0]);

    // Scenario list
    let mut lines = Vec::new();
    for (i, scenario) in app.scenarios.iter().enumerate() {
        let selected = i == app.selected_scenario;
        let style = if selected {
            app.theme.selected_style()
        } else {
            app.theme.player_style()
        };
        let marker = if selected { "▶" } else { " " };
        lines.push(Line::from(Span::styled(
            format!("{marker} {}", scenario.title),
            style,
        )));
        if let Some(description) = &scenario.description {
            lines.push(Line::from(Span::styled(
                format!("    {description}"),
                app.theme.system_style(),
            )));
        }
        lines.push(Line::from(""));
    }
    if let Some(saved) = &app.saved_game {
        lines.push(Line::from(vec![
            Span::styled("c ", app.theme.title_style()),
            Span::raw(format!(
                "Continue {} (♥ {})",
                app.engine.catalog().title_for(saved.scenario_id()),
                saved.favorability()
            )),
        ]));
    }
    let list = Paragraph::new(lines).block(
        Block::default()
            .title(" Choose a scenario ")
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(true)),
    );
    frame.render_widget(list, chunks[1]);

    // Lifetime statistics
    let stats = app.statistics();
    let stats_lines = vec![
        Line::from(format!(
            "Games played: {}   Highest score: {}   Choices made: {}",
            stats.games_played, stats.highest_score, stats.total_choices
        )),
        Line::from(format!(
            "Play time: {}m {}s   Scenarios completed: {}",
            stats.total_play_time_secs / 60,
            stats.total_play_time_secs % 60,
            stats.completed_scenarios.len()
        )),
    ];
    let stats_panel = Paragraph::new(stats_lines).style(app.theme.system_style()).block(
        Block::default()
            .title(" Statistics ")
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(false)),
    );
    frame.render_widget(stats_panel, chunks[2]);

    render_hotkeys(
        frame,
        app,
        chunks[3],
        "↑/↓ select  Enter start  c continue  l leaderboard  ? help  q quit",
    );
}

fn render_playing<B: ScenarioBackend, S: SaveStore>(frame: &mut Frame, app: &App<B, S>, area: Rect) {
    let choices = app.current_choices();
    let layout = PlayLayout::calculate(area, choices.len());

    // Header: scenario title and favorability
    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(layout.header);
    let scenario_title = app
        .engine
        .session()
        .map(|s| app.engine.catalog().title_for(s.scenario_id()))
        .unwrap_or_default();
    let title = Paragraph::new(Line::from(Span::styled(
        format!(" {scenario_title}"),
        app.theme.title_style(),
    )))
    .block(Block::default().borders(Borders::ALL).border_style(app.theme.border_style(false)));
    frame.render_widget(title, header[0]);
    frame.render_widget(FavorabilityGauge::new(app.favorability(), &app.theme), header[1]);

    let mood = app
        .engine
        .current_scene()
        .and_then(|s| s.character_mood.as_deref());
    let typing = !app.typewriter.is_done();
    frame.render_widget(
        SceneWidget::new(app.character_name(), app.typewriter.visible(), &app.theme)
            .mood(mood)
            .typing(typing, app.animation_frame)
            .paused(app.engine.is_paused()),
        layout.scene,
    );

    frame.render_widget(
        ChoicesWidget::new(choices, &app.theme)
            .selected(app.selected_choice)
            .enabled(!typing && !app.engine.is_paused()),
        layout.choices,
    );

    render_hotkeys(
        frame,
        app,
        layout.status,
        "1-9/Enter choose  Space skip  p pause  l leaderboard  Esc menu  ? help",
    );
}

fn render_result<B: ScenarioBackend, S: SaveStore>(frame: &mut Frame, app: &App<B, S>, area: Rect) {
    let Some(outcome) = app.outcome() else {
        return;
    };
    let result = &outcome.result;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(area);

    // Closing line
    let closing = Paragraph::new(Line::from(Span::styled(
        app.typewriter.visible(),
        app.theme.character_style(),
    )))
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(format!(" {} ", app.character_name()))
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(false)),
    );
    frame.render_widget(closing, chunks[0]);

    frame.render_widget(FavorabilityGauge::new(result.score, &app.theme), chunks[1]);

    let mut lines = vec![
        Line::from(Span::styled(result.title.as_str(), app.theme.title_style())),
        Line::from(""),
        Line::from(result.advice.as_str()),
        Line::from(""),
    ];
    if let Some(best) = &result.best_choice {
        lines.push(Line::from(vec![
            Span::styled("Best choice:  ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("\"{}\" ({:+})", best.text, best.favorability_delta),
                app.theme.player_style(),
            ),
        ]));
    }
    if let Some(worst) = &result.worst_choice {
        lines.push(Line::from(vec![
            Span::styled("Worst choice: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("\"{}\" ({:+})", worst.text, worst.favorability_delta),
                app.theme.player_style(),
            ),
        ]));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "Play time: {}m {}s   Choices: {}",
            result.play_time_secs / 60,
            result.play_time_secs % 60,
            result.choices_count
        ),
        app.theme.system_style(),
    )));
    let summary = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(format!(" {} ", result.scenario_title))
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(true)),
    );
    frame.render_widget(summary, chunks[2]);

    match app.engine.submitted_rank() {
        Some(rank) => {
            let ranked = Paragraph::new(Line::from(Span::styled(
                format!("Submitted! You placed #{rank}"),
                app.theme.title_style(),
            )))
            .block(Block::default().borders(Borders::ALL).border_style(app.theme.border_style(false)));
            frame.render_widget(ranked, chunks[3]);
        }
        None => frame.render_widget(
            InputWidget::new(app.input_buffer(), &app.theme)
                .cursor_position(app.cursor_position())
                .active(!app.is_busy()),
            chunks[3],
        ),
    }

    render_hotkeys(
        frame,
        app,
        chunks[4],
        "Enter submit  Tab leaderboard  Esc menu  F1 help",
    );
}

/// One-line hotkey hints, replaced by the status message when there is one.
fn render_hotkeys<B: ScenarioBackend, S: SaveStore>(
    frame: &mut Frame,
    app: &App<B, S>,
    area: Rect,
    hints: &str,
) {
    let line = match app.pending_status().or(app.status_message()) {
        Some(status) => Line::from(Span::styled(
            status,
            app.theme.title_style(),
        )),
        None => Line::from(Span::styled(hints, app.theme.system_style())),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_help_overlay<B: ScenarioBackend, S: SaveStore>(
    frame: &mut Frame,
    app: &App<B, S>,
    area: Rect,
) {
    let popup_area = centered_rect_fixed(52, 22, area);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let heading = Style::default().add_modifier(Modifier::UNDERLINED);
    let help_text = vec![
        Line::from(Span::styled(
            " Love Simulator - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Scenario list:", heading)),
        Line::from("  j/k or ↑/↓     Select scenario"),
        Line::from("  Enter          Start a new game"),
        Line::from("  c              Continue saved game"),
        Line::from(""),
        Line::from(Span::styled("In a scene:", heading)),
        Line::from("  1-9            Pick a choice"),
        Line::from("  j/k + Enter    Highlight and pick"),
        Line::from("  Space          Show the whole line"),
        Line::from("  p              Pause / resume"),
        Line::from("  Esc            Back to menu (game is saved)"),
        Line::from(""),
        Line::from(Span::styled("Anywhere:", heading)),
        Line::from("  l              Leaderboard (f: filter, r: refresh)"),
        Line::from("  q / Ctrl+C     Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or q to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}

fn render_leaderboard_overlay<B: ScenarioBackend, S: SaveStore>(
    frame: &mut Frame,
    app: &App<B, S>,
    area: Rect,
) {
    let popup_area = centered_rect_fixed(64, 20, area);
    frame.render_widget(Clear, popup_area);

    let filter = app.ranking_filter();
    let title = match &filter {
        Some(f) => format!(" 🏆 Leaderboard: {} ", f.scenario_title),
        None => " 🏆 Leaderboard: all scenarios ".to_string(),
    };

    let mut lines = Vec::new();
    if app.rankings.is_empty() {
        let empty = if app.is_busy() { "Loading..." } else { "No rankings yet" };
        lines.push(Line::from(Span::styled(empty, app.theme.system_style())));
    }
    for (i, entry) in app.rankings.iter().enumerate() {
        let medal = match i {
            0 => "🥇",
            1 => "🥈",
            2 => "🥉",
            _ => "  ",
        };
        let mut spans = vec![
            Span::raw(format!("{medal} {:>2}. ", i + 1)),
            Span::styled(format!("{:<20}", entry.nickname), app.theme.player_style()),
            Span::styled(
                format!("{:>3}", entry.score),
                Style::default()
                    .fg(app.theme.love_color(entry.score))
                    .add_modifier(Modifier::BOLD),
            ),
        ];
        if filter.is_none() {
            spans.push(Span::styled(
                format!("  {}", entry.scenario_title),
                app.theme.system_style(),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "f toggle filter  r refresh  Esc close",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), popup_area);
}

fn render_toasts<B: ScenarioBackend, S: SaveStore>(frame: &mut Frame, app: &App<B, S>, area: Rect) {
    let widget = ToastWidget::new(app.toasts(), &app.theme);
    let height = widget.height().min(area.height);
    if height == 0 {
        return;
    }
    let width = (area.width / 2).max(30).min(area.width);
    let toast_area = Rect {
        x: area.x + area.width - width,
        y: area.y,
        width,
        height,
    };
    frame.render_widget(widget, toast_area);
}
