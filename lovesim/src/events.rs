//! Event handling for the Love Simulator TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use lovesim_core::{SaveStore, ScenarioBackend};

use crate::app::{App, Screen};
use crate::ui::Overlay;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event<B: ScenarioBackend, S: SaveStore>(
    app: &mut App<B, S>,
    event: Event,
) -> EventResult {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(app, key),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event<B: ScenarioBackend, S: SaveStore>(
    app: &mut App<B, S>,
    key: KeyEvent,
) -> EventResult {
    // Global shortcuts (always work)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if let Some(overlay) = app.overlay {
        return handle_overlay_key(app, overlay, key);
    }

    match app.screen {
        Screen::ScenarioSelect => handle_scenario_select(app, key),
        Screen::Playing => handle_playing(app, key),
        Screen::Result => handle_result(app, key),
    }
}

fn handle_overlay_key<B: ScenarioBackend, S: SaveStore>(
    app: &mut App<B, S>,
    overlay: Overlay,
    key: KeyEvent,
) -> EventResult {
    match (overlay, key.code) {
        (_, KeyCode::Esc | KeyCode::Char('q')) => app.close_overlay(),
        (Overlay::Help, KeyCode::Char('?') | KeyCode::Enter) => app.close_overlay(),
        (Overlay::Leaderboard, KeyCode::Char('f')) => app.toggle_ranking_filter(),
        (Overlay::Leaderboard, KeyCode::Char('r')) => app.open_leaderboard(),
        (Overlay::Leaderboard, KeyCode::Tab | KeyCode::Char('l')) => app.close_overlay(),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Keys on the scenario list
fn handle_scenario_select<B: ScenarioBackend, S: SaveStore>(
    app: &mut App<B, S>,
    key: KeyEvent,
) -> EventResult {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return EventResult::Quit,
        KeyCode::Char('j') | KeyCode::Down => app.select_next_scenario(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_scenario(),
        KeyCode::Enter => app.start_selected(),
        KeyCode::Char('c') => app.continue_saved(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.open_leaderboard(),
        KeyCode::Char('?') | KeyCode::F(1) => app.toggle_help(),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Keys while a scene is on screen
fn handle_playing<B: ScenarioBackend, S: SaveStore>(
    app: &mut App<B, S>,
    key: KeyEvent,
) -> EventResult {
    match key.code {
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            app.choose(index);
        }
        KeyCode::Char('j') | KeyCode::Down => app.select_next_choice(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_choice(),
        KeyCode::Enter => app.confirm_choice(),
        KeyCode::Char(' ') => app.skip_typewriter(),
        KeyCode::Char('p') => app.toggle_pause(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.open_leaderboard(),
        KeyCode::Char('?') | KeyCode::F(1) => app.toggle_help(),
        KeyCode::Esc => app.back_to_menu(),
        KeyCode::Char('q') => return EventResult::Quit,
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

/// Keys on the result screen. Typing edits the nickname.
fn handle_result<B: ScenarioBackend, S: SaveStore>(
    app: &mut App<B, S>,
    key: KeyEvent,
) -> EventResult {
    match key.code {
        KeyCode::Enter => app.submit_nickname(),
        KeyCode::Esc => app.back_to_menu(),
        KeyCode::Tab => app.open_leaderboard(),
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::Char(c) => app.type_char(c),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PendingAction;
    use lovesim_core::testing::{ending, scene};
    use lovesim_core::{Choice, GameEngine, GameRules, MemorySaveStore, MockBackend};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn playing_app() -> App<MockBackend, MemorySaveStore> {
        let backend = MockBackend::new()
            .with_scene(
                "teacher",
                1,
                scene(
                    "질문 있나요?",
                    vec![Choice::new("Yes!", 5, 2), Choice::new("No", -5, 2)],
                ),
            )
            .with_scene("teacher", 2, ending("Class dismissed."));
        let engine = GameEngine::new(backend, MemorySaveStore::new(), GameRules::default());
        let mut app = App::new(engine).await;
        app.run_action(PendingAction::StartGame("teacher".into()))
            .await;
        app
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_anywhere() {
        let mut app = playing_app().await;
        app.toggle_help();
        let ev = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(handle_event(&mut app, ev), EventResult::Quit);
    }

    #[tokio::test]
    async fn test_number_keys_choose() {
        let mut app = playing_app().await;
        handle_event(&mut app, key(KeyCode::Char('2')));
        assert_eq!(app.take_pending(), Some(PendingAction::Choose(1)));

        // Out of range numbers are ignored.
        handle_event(&mut app, key(KeyCode::Char('9')));
        assert_eq!(app.take_pending(), None);
    }

    #[tokio::test]
    async fn test_overlay_captures_keys() {
        let mut app = playing_app().await;
        handle_event(&mut app, key(KeyCode::Char('l')));
        assert_eq!(app.overlay, Some(Overlay::Leaderboard));
        assert_eq!(app.take_pending(), Some(PendingAction::LoadRankings));

        handle_event(&mut app, key(KeyCode::Char('1')));
        assert_eq!(app.take_pending(), None);

        handle_event(&mut app, key(KeyCode::Char('f')));
        assert!(!app.rankings_filtered);
        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.overlay, None);
    }

    #[tokio::test]
    async fn test_result_screen_types_nickname() {
        let mut app = playing_app().await;
        app.run_action(PendingAction::Choose(0)).await;
        assert_eq!(app.screen, Screen::Result);

        for c in "q p".chars() {
            assert_eq!(handle_event(&mut app, key(KeyCode::Char(c))), EventResult::NeedsRedraw);
        }
        assert_eq!(app.input_buffer(), "q p");

        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(
            app.take_pending(),
            Some(PendingAction::SubmitRanking("q p".into()))
        );
    }
}
