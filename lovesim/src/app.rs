//! Application state for the Love Simulator TUI

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lovesim_api::{RankingEntry, RankingFilter, ScenarioSummary};
use lovesim_core::{
    AchievementTracker, Choice, EndReason, EngineError, GameEngine, GameSession, Outcome,
    PlayStatistics, Progress, SaveStore, ScenarioBackend,
};
use tracing::warn;

use crate::ui::theme::GameTheme;
use crate::ui::Overlay;

/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_millis(3000);

/// Characters revealed per tick. Ticks arrive roughly every 100ms, so this
/// reveals one character per 50ms.
pub const TYPEWRITER_CHARS_PER_TICK: usize = 2;

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    ScenarioSelect,
    Playing,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
    Achievement,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    expires_at: Instant,
}

/// Engine work requested by a key press, run by the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    LoadScenarios,
    StartGame(String),
    ResumeGame,
    Choose(usize),
    SubmitRanking(String),
    LoadRankings,
}

impl PendingAction {
    /// Status shown while the action runs.
    pub fn status(&self) -> &'static str {
        match self {
            PendingAction::LoadScenarios => "Loading scenarios...",
            PendingAction::StartGame(_) | PendingAction::ResumeGame => "Starting...",
            PendingAction::Choose(_) => "Thinking...",
            PendingAction::SubmitRanking(_) => "Submitting score...",
            PendingAction::LoadRankings => "Loading leaderboard...",
        }
    }
}

/// Reveals a line of dialogue a few characters at a time.
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    text: String,
    shown: usize,
}

impl Typewriter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown: 0,
        }
    }

    pub fn advance(&mut self, chars: usize) {
        self.shown = (self.shown + chars).min(self.text.chars().count());
    }

    pub fn skip(&mut self) {
        self.shown = self.text.chars().count();
    }

    pub fn is_done(&self) -> bool {
        self.shown >= self.text.chars().count()
    }

    /// The revealed prefix (unicode-safe)
    pub fn visible(&self) -> &str {
        match self.text.char_indices().nth(self.shown) {
            Some((byte_pos, _)) => &self.text[..byte_pos],
            None => &self.text,
        }
    }
}

/// Main application state
pub struct App<B, S> {
    pub engine: GameEngine<B, S>,
    pub screen: Screen,
    pub overlay: Option<Overlay>,
    pub theme: GameTheme,

    pub scenarios: Vec<ScenarioSummary>,
    pub selected_scenario: usize,
    pub selected_choice: usize,
    pub typewriter: Typewriter,

    pub rankings: Vec<RankingEntry>,
    /// Leaderboard limited to the current scenario.
    pub rankings_filtered: bool,

    /// The save `c` would continue, shown on the scenario screen.
    pub saved_game: Option<GameSession>,

    pub animation_frame: u8,

    pending: Option<PendingAction>,
    input_buffer: String,
    cursor_position: usize,
    toasts: Vec<Toast>,
    status_message: Option<String>,
    achievements: Arc<Mutex<AchievementTracker>>,
    stats: Arc<Mutex<PlayStatistics>>,
}

impl<B: ScenarioBackend, S: SaveStore> App<B, S> {
    pub async fn new(mut engine: GameEngine<B, S>) -> Self {
        let stats = Arc::new(Mutex::new(PlayStatistics::load(engine.save_store()).await));
        let achievements = Arc::new(Mutex::new(AchievementTracker::new()));
        engine.subscribe(Arc::clone(&stats));
        engine.subscribe(Arc::clone(&achievements));
        let saved_game = engine.saved_game().await;
        let scenarios = engine.catalog().summaries();

        Self {
            engine,
            screen: Screen::ScenarioSelect,
            overlay: None,
            theme: GameTheme::default(),
            scenarios,
            selected_scenario: 0,
            selected_choice: 0,
            typewriter: Typewriter::default(),
            rankings: Vec::new(),
            rankings_filtered: true,
            saved_game,
            animation_frame: 0,
            pending: None,
            input_buffer: String::new(),
            cursor_position: 0,
            toasts: Vec::new(),
            status_message: None,
            achievements,
            stats,
        }
    }

    // =========================================================================
    // Pending engine work
    // =========================================================================

    /// Queue engine work. Ignored while other work is queued.
    pub fn request(&mut self, action: PendingAction) {
        if self.pending.is_some() {
            return;
        }
        self.pending = Some(action);
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn take_pending(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }

    /// Status line for the queued action, if any.
    pub fn pending_status(&self) -> Option<&'static str> {
        self.pending.as_ref().map(PendingAction::status)
    }

    /// Run the queued action, if any.
    pub async fn run_pending(&mut self) {
        if let Some(action) = self.pending.take() {
            self.run_action(action).await;
        }
    }

    /// Run one queued action against the engine.
    pub async fn run_action(&mut self, action: PendingAction) {
        match action {
            PendingAction::LoadScenarios => {
                self.scenarios = self.engine.scenarios().await;
                self.selected_scenario = self
                    .selected_scenario
                    .min(self.scenarios.len().saturating_sub(1));
            }
            PendingAction::StartGame(scenario_id) => {
                let progress = self.engine.start_new_game(&scenario_id).await;
                self.show_progress(progress).await;
            }
            PendingAction::ResumeGame => match self.engine.resume_saved().await {
                Ok(progress) => self.show_progress(progress).await,
                Err(e) => {
                    self.saved_game = None;
                    self.push_toast(e.to_string(), ToastKind::Error);
                }
            },
            PendingAction::Choose(index) => match self.engine.choose(index).await {
                Ok(progress) => self.show_progress(progress).await,
                Err(e) => self.push_toast(e.to_string(), ToastKind::Error),
            },
            PendingAction::SubmitRanking(nickname) => {
                match self.engine.submit_ranking(&nickname).await {
                    Ok(receipt) => {
                        let message = match receipt.message {
                            Some(m) => format!("Rank #{}: {m}", receipt.rank),
                            None => format!("You placed #{}!", receipt.rank),
                        };
                        self.push_toast(message, ToastKind::Success);
                        self.clear_input();
                        self.rankings_filtered = true;
                        self.overlay = Some(Overlay::Leaderboard);
                        self.load_rankings().await;
                    }
                    Err(EngineError::Api(e)) => {
                        let message = e.server_message().map(str::to_string);
                        self.push_toast(message.unwrap_or_else(|| e.to_string()), ToastKind::Error);
                    }
                    Err(e @ EngineError::Validation(_)) => {
                        self.push_toast(e.to_string(), ToastKind::Warning)
                    }
                    Err(e) => self.push_toast(e.to_string(), ToastKind::Error),
                }
            }
            PendingAction::LoadRankings => self.load_rankings().await,
        }
        self.drain_achievements();
    }

    async fn load_rankings(&mut self) {
        let filter = self.ranking_filter();
        match self.engine.rankings(filter.as_ref()).await {
            Ok(entries) => self.rankings = entries,
            Err(e) => {
                self.rankings.clear();
                self.push_toast(format!("Leaderboard unavailable: {e}"), ToastKind::Error);
            }
        }
    }

    /// Filter for the leaderboard, if it is limited to a scenario.
    pub fn ranking_filter(&self) -> Option<RankingFilter> {
        if !self.rankings_filtered {
            return None;
        }
        let session = self.engine.session()?;
        Some(RankingFilter::for_scenario(
            self.engine.catalog().title_for(session.scenario_id()),
        ))
    }

    async fn show_progress(&mut self, progress: Progress) {
        self.selected_choice = 0;
        match progress {
            Progress::Continue(scene) => {
                self.typewriter = Typewriter::new(scene.ai_line);
                self.screen = Screen::Playing;
            }
            Progress::Finished(outcome) => {
                self.typewriter = match &outcome.final_scene {
                    Some(scene) => Typewriter::new(scene.ai_line.clone()),
                    None => Typewriter::default(),
                };
                if let EndReason::LoadFailed(message) = &outcome.reason {
                    self.push_toast(
                        format!("The story could not continue: {message}"),
                        ToastKind::Error,
                    );
                }
                self.saved_game = None;
                self.clear_input();
                self.screen = Screen::Result;
                self.save_stats().await;
            }
        }
    }

    async fn save_stats(&self) {
        let snapshot = match self.stats.lock() {
            Ok(stats) => stats.clone(),
            Err(_) => return,
        };
        if let Err(e) = snapshot.save(self.engine.save_store()).await {
            warn!(error = %e, "failed to save statistics");
        }
    }

    fn drain_achievements(&mut self) {
        let unlocked = match self.achievements.lock() {
            Ok(mut tracker) => tracker.take_new(),
            Err(_) => return,
        };
        for achievement in unlocked {
            self.push_toast(
                format!("🏆 {}: {}", achievement.title(), achievement.description()),
                ToastKind::Achievement,
            );
        }
    }

    // =========================================================================
    // Scenario selection
    // =========================================================================

    pub fn select_next_scenario(&mut self) {
        if !self.scenarios.is_empty() {
            self.selected_scenario = (self.selected_scenario + 1) % self.scenarios.len();
        }
    }

    pub fn select_prev_scenario(&mut self) {
        if !self.scenarios.is_empty() {
            self.selected_scenario = self
                .selected_scenario
                .checked_sub(1)
                .unwrap_or(self.scenarios.len() - 1);
        }
    }

    pub fn start_selected(&mut self) {
        if let Some(scenario) = self.scenarios.get(self.selected_scenario) {
            let id = scenario.name.clone();
            self.request(PendingAction::StartGame(id));
        }
    }

    pub fn continue_saved(&mut self) {
        if self.saved_game.is_some() {
            self.request(PendingAction::ResumeGame);
        } else {
            self.push_toast("No saved game to continue", ToastKind::Info);
        }
    }

    /// Leave the current game for the scenario list. An unfinished game stays saved.
    pub fn back_to_menu(&mut self) {
        if self.screen == Screen::Playing {
            self.saved_game = self.engine.session().cloned();
        }
        self.screen = Screen::ScenarioSelect;
        self.overlay = None;
        self.clear_input();
    }

    // =========================================================================
    // Playing
    // =========================================================================

    pub fn current_choices(&self) -> &[Choice] {
        self.engine
            .current_scene()
            .map(|s| s.user_cards.as_slice())
            .unwrap_or(&[])
    }

    pub fn favorability(&self) -> u8 {
        self.engine
            .session()
            .map_or(0, |s| s.favorability().value())
    }

    pub fn select_next_choice(&mut self) {
        let count = self.current_choices().len();
        if count > 0 {
            self.selected_choice = (self.selected_choice + 1) % count;
        }
    }

    pub fn select_prev_choice(&mut self) {
        let count = self.current_choices().len();
        if count > 0 {
            self.selected_choice = self.selected_choice.checked_sub(1).unwrap_or(count - 1);
        }
    }

    /// Confirm the highlighted choice. The first press finishes the line of dialogue.
    pub fn confirm_choice(&mut self) {
        if !self.typewriter.is_done() {
            self.typewriter.skip();
            return;
        }
        self.choose(self.selected_choice);
    }

    /// Pick choice `index` (0-based).
    pub fn choose(&mut self, index: usize) {
        if self.engine.is_paused() {
            self.set_status("Paused: press p to resume");
            return;
        }
        if index < self.current_choices().len() {
            self.typewriter.skip();
            self.selected_choice = index;
            self.request(PendingAction::Choose(index));
        }
    }

    pub fn skip_typewriter(&mut self) {
        self.typewriter.skip();
    }

    pub fn toggle_pause(&mut self) {
        let result = if self.engine.is_paused() {
            self.engine.resume()
        } else {
            self.engine.pause()
        };
        match result {
            Ok(()) if self.engine.is_paused() => self.set_status("Paused"),
            Ok(()) => self.status_message = None,
            Err(e) => self.push_toast(e.to_string(), ToastKind::Error),
        }
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.engine.outcome()
    }

    /// Display name of the character in the current scenario.
    pub fn character_name(&self) -> &str {
        let Some(session) = self.engine.session() else {
            return "";
        };
        match self.engine.catalog().get(session.scenario_id()) {
            Some(info) => info.character,
            None => session.scenario_id(),
        }
    }

    pub fn statistics(&self) -> PlayStatistics {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Leaderboard
    // =========================================================================

    pub fn open_leaderboard(&mut self) {
        self.overlay = Some(Overlay::Leaderboard);
        self.request(PendingAction::LoadRankings);
    }

    pub fn toggle_ranking_filter(&mut self) {
        self.rankings_filtered = !self.rankings_filtered;
        self.request(PendingAction::LoadRankings);
    }

    /// Submit the nickname typed on the result screen.
    pub fn submit_nickname(&mut self) {
        let nickname = self.input_buffer.clone();
        self.request(PendingAction::SubmitRanking(nickname));
    }

    // =========================================================================
    // Nickname input
    // =========================================================================

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    /// Handle character input (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        // Convert cursor position (character index) to byte index
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Handle delete (unicode-safe)
    pub fn delete(&mut self) {
        if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position) {
            self.input_buffer
                .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    // =========================================================================
    // Overlays, toasts and status
    // =========================================================================

    pub fn toggle_help(&mut self) {
        self.overlay = match self.overlay {
            Some(Overlay::Help) => None,
            _ => Some(Overlay::Help),
        };
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn push_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toasts.push(Toast {
            message: message.into(),
            kind,
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Advance animations. The typewriter holds while the game is paused.
    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
        if !self.engine.is_paused() {
            self.typewriter.advance(TYPEWRITER_CHARS_PER_TICK);
        }
        let now = Instant::now();
        self.toasts.retain(|t| t.expires_at > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovesim_core::testing::{ending, scene};
    use lovesim_core::{GameRules, MemorySaveStore, MockBackend};

    const SCENARIO: &str = "female-friend";

    fn backend() -> MockBackend {
        MockBackend::new()
            .with_scene(
                SCENARIO,
                1,
                scene(
                    "안녕! 오늘 뭐 해?",
                    vec![
                        Choice::new("Let's see a movie", 35, 2),
                        Choice::new("Nothing much", -5, 2),
                    ],
                ),
            )
            .with_scene(SCENARIO, 2, ending("That was fun!"))
            .with_rankings(vec![RankingEntry {
                nickname: "champion".into(),
                score: 99,
                scenario_title: "여사친에게 다가가기".into(),
                play_time: None,
                choices_count: None,
            }])
    }

    async fn app() -> App<MockBackend, MemorySaveStore> {
        let engine = GameEngine::new(backend(), MemorySaveStore::new(), GameRules::default());
        App::new(engine).await
    }

    async fn run_pending(app: &mut App<MockBackend, MemorySaveStore>) {
        let action = app.take_pending().expect("an action should be queued");
        app.run_action(action).await;
    }

    #[test]
    fn test_typewriter_unicode() {
        let mut tw = Typewriter::new("안녕하세요");
        assert_eq!(tw.visible(), "");
        tw.advance(2);
        assert_eq!(tw.visible(), "안녕");
        tw.advance(10);
        assert!(tw.is_done());
        assert_eq!(tw.visible(), "안녕하세요");
    }

    #[tokio::test]
    async fn test_play_to_result_screen() {
        let mut app = app().await;
        assert_eq!(app.screen, Screen::ScenarioSelect);
        assert_eq!(app.scenarios.len(), 3);

        app.start_selected();
        run_pending(&mut app).await;
        assert_eq!(app.screen, Screen::Playing);
        assert_eq!(app.current_choices().len(), 2);

        // First confirm only finishes the dialogue line.
        app.confirm_choice();
        assert!(app.typewriter.is_done());
        assert!(!app.is_busy());

        app.select_next_choice();
        app.select_next_choice();
        app.confirm_choice();
        run_pending(&mut app).await;

        assert_eq!(app.screen, Screen::Result);
        assert_eq!(app.outcome().unwrap().result.score, 85);
        let achievements: Vec<_> = app
            .toasts()
            .iter()
            .filter(|t| t.kind == ToastKind::Achievement)
            .collect();
        assert_eq!(achievements.len(), 2);
    }

    #[tokio::test]
    async fn test_paused_game_holds_typewriter_and_choices() {
        let mut app = app().await;
        app.start_selected();
        run_pending(&mut app).await;

        app.toggle_pause();
        app.tick();
        assert_eq!(app.typewriter.visible(), "");
        app.choose(0);
        assert!(!app.is_busy());

        app.toggle_pause();
        app.tick();
        assert_eq!(app.typewriter.visible(), "안녕");
    }

    #[tokio::test]
    async fn test_only_one_action_in_flight() {
        let mut app = app().await;
        app.start_selected();
        app.continue_saved();
        app.open_leaderboard();
        assert_eq!(app.take_pending(), Some(PendingAction::StartGame(SCENARIO.into())));
        assert_eq!(app.take_pending(), None);
    }

    #[tokio::test]
    async fn test_submit_ranking_from_result_screen() {
        let mut app = app().await;
        app.start_selected();
        run_pending(&mut app).await;
        app.choose(0);
        run_pending(&mut app).await;

        for c in "수진".chars() {
            app.type_char(c);
        }
        app.submit_nickname();
        run_pending(&mut app).await;

        assert_eq!(app.overlay, Some(Overlay::Leaderboard));
        assert_eq!(app.rankings.len(), 1);
        assert!(app.input_buffer().is_empty());
        assert!(app
            .toasts()
            .iter()
            .any(|t| t.kind == ToastKind::Success && t.message.contains("#2")));
    }

    #[tokio::test]
    async fn test_invalid_nickname_is_a_warning() {
        let mut app = app().await;
        app.start_selected();
        run_pending(&mut app).await;
        app.choose(0);
        run_pending(&mut app).await;

        app.type_char('x');
        app.submit_nickname();
        run_pending(&mut app).await;

        assert_eq!(app.overlay, None);
        assert!(app
            .toasts()
            .iter()
            .any(|t| t.kind == ToastKind::Warning && t.message.starts_with("Nickname")));
        assert!(!app.toasts().iter().any(|t| t.kind == ToastKind::Error));
    }

    #[tokio::test]
    async fn test_back_to_menu_offers_continue() {
        let mut app = app().await;
        assert!(app.saved_game.is_none());
        app.continue_saved();
        assert!(!app.is_busy());

        app.start_selected();
        run_pending(&mut app).await;
        app.back_to_menu();
        assert_eq!(app.screen, Screen::ScenarioSelect);
        assert!(app.saved_game.is_some());

        app.continue_saved();
        run_pending(&mut app).await;
        assert_eq!(app.screen, Screen::Playing);
    }

    #[tokio::test]
    async fn test_input_editing_unicode() {
        let mut app = app().await;
        for c in "김민수".chars() {
            app.type_char(c);
        }
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input_buffer(), "김수");
        app.cursor_home();
        app.delete();
        assert_eq!(app.input_buffer(), "수");
        app.cursor_end();
        app.type_char('!');
        assert_eq!(app.input_buffer(), "수!");
    }
}
