//! Scene progression engine.
//!
//! [`GameEngine`] drives one play-through: it loads scenes from a
//! [`ScenarioBackend`], applies choices to the [`GameStateStore`], decides the
//! next scene and produces a [`GameResult`] when the game ends. Every front-end
//! talks to the same engine; observers receive [`GameEvent`]s for each step.

use crate::backend::ScenarioBackend;
use crate::config::{GameConfig, GameRules, ScenarioCatalog};
use crate::events::{EventBus, GameEvent, SessionObserver};
use crate::persist::{FileSaveStore, SaveStore};
use crate::progression::next_scene_id;
use crate::result::{summarize, GameResult};
use crate::state::{GameSession, GameStateStore, NoSession};
use crate::validation::{validate_nickname, validate_score, ValidationError};
use chrono::{DateTime, Utc};
use lovesim_api::{
    Client, RankingEntry, RankingFilter, RankingReceipt, RankingSubmission, RetryPolicy,
    ScenarioSummary, Scene, SceneId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    NoSession(#[from] NoSession),

    #[error("No saved game to resume")]
    NothingToResume,

    #[error("Choice {index} does not exist ({available} available)")]
    InvalidChoice { index: usize, available: usize },

    #[error("A scene is still loading")]
    ChoiceInFlight,

    #[error("No scene is waiting for a choice")]
    NoPendingChoice,

    #[error("The game has already ended")]
    GameFinished,

    #[error("The game has not ended yet")]
    GameNotFinished,

    #[error("This result was already submitted (rank {0})")]
    AlreadySubmitted(u32),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] lovesim_api::Error),
}

/// Where the engine is in a play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No game started yet.
    Idle,
    /// A scene request is outstanding.
    Loading,
    /// A scene with choices is on screen.
    AwaitingChoice,
    Ended,
}

/// Why a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// A scene without choices was reached.
    TerminalScene,
    /// The next scene does not exist.
    ContentExhausted,
    /// The next scene could not be loaded.
    LoadFailed(String),
}

/// Everything a result screen needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The closing scene, if one was loaded.
    pub final_scene: Option<Scene>,
    pub result: GameResult,
    pub reason: EndReason,
}

/// What happened after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Continue(Scene),
    Finished(Outcome),
}

impl Progress {
    pub fn is_finished(&self) -> bool {
        matches!(self, Progress::Finished(_))
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct GameEngine<B, S> {
    backend: B,
    state: GameStateStore<S>,
    catalog: ScenarioCatalog,
    events: EventBus,
    clock: Clock,
    phase: Phase,
    scene: Option<Scene>,
    outcome: Option<Outcome>,
    submitted_rank: Option<u32>,
}

impl GameEngine<Client, FileSaveStore> {
    /// Engine talking to the configured server and saving under the save directory.
    pub fn from_config(config: &GameConfig) -> Result<Self, lovesim_api::Error> {
        let client = Client::with_settings(
            &config.api_url,
            config.request_timeout,
            RetryPolicy::default(),
        )?;
        let store = FileSaveStore::new(&config.save_dir);
        Ok(Self::new(client, store, config.rules.clone()))
    }
}

impl<B: ScenarioBackend, S: SaveStore> GameEngine<B, S> {
    pub fn new(backend: B, store: S, rules: GameRules) -> Self {
        Self {
            backend,
            state: GameStateStore::new(store, rules),
            catalog: ScenarioCatalog::builtin(),
            events: EventBus::new(),
            clock: Arc::new(Utc::now),
            phase: Phase::Idle,
            scene: None,
            outcome: None,
            submitted_rank: None,
        }
    }

    pub fn with_catalog(mut self, catalog: ScenarioCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Replace the wall clock, mainly for tests.
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.events.subscribe(observer);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.state.session()
    }

    /// The scene waiting for a choice.
    pub fn current_scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// Leaderboard rank of the finished game, once submitted.
    pub fn submitted_rank(&self) -> Option<u32> {
        self.submitted_rank
    }

    pub fn rules(&self) -> &GameRules {
        self.state.rules()
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn save_store(&self) -> &S {
        self.state.save_store()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Begin a new play-through of `scenario_id` and load its first scene.
    pub async fn start_new_game(&mut self, scenario_id: &str) -> Progress {
        let now = self.now();
        let session = self.state.reset(scenario_id, now);
        let event = GameEvent::GameStarted {
            session_id: session.session_id(),
            scenario_id: session.scenario_id().to_string(),
            resumed: false,
        };
        let first = self.rules().scenes.first;

        self.begin();
        self.events.emit(event);
        self.load_scene(first).await
    }

    /// Continue a saved play-through from its last loaded scene.
    pub async fn resume_saved(&mut self) -> Result<Progress, EngineError> {
        let now = self.now();
        let session = self
            .state
            .restore(now)
            .await
            .ok_or(EngineError::NothingToResume)?;
        let event = GameEvent::GameStarted {
            session_id: session.session_id(),
            scenario_id: session.scenario_id().to_string(),
            resumed: true,
        };
        let scene_id = session.current_scene_id();

        self.begin();
        self.events.emit(event);
        Ok(self.load_scene(scene_id).await)
    }

    /// The saved play-through [`resume_saved`](Self::resume_saved) would continue, if any.
    pub async fn saved_game(&self) -> Option<GameSession> {
        self.state.peek_saved(self.now()).await
    }

    /// Load the session's current scene again, e.g. after an interrupted request.
    pub async fn reload(&mut self) -> Result<Progress, EngineError> {
        if self.phase == Phase::Ended {
            return Err(EngineError::GameFinished);
        }
        let scene_id = self.state.session().ok_or(NoSession)?.current_scene_id();
        Ok(self.load_scene(scene_id).await)
    }

    /// Apply the choice at `index` of the current scene and move on.
    pub async fn choose(&mut self, index: usize) -> Result<Progress, EngineError> {
        match self.phase {
            Phase::AwaitingChoice => {}
            Phase::Idle => return Err(EngineError::NoPendingChoice),
            Phase::Loading => return Err(EngineError::ChoiceInFlight),
            Phase::Ended => return Err(EngineError::GameFinished),
        }

        let scene = self.scene.as_ref().ok_or(EngineError::NoPendingChoice)?;
        let choice = scene
            .user_cards
            .get(index)
            .cloned()
            .ok_or(EngineError::InvalidChoice {
                index,
                available: scene.user_cards.len(),
            })?;

        let now = self.now();
        let change = self.state.record_choice(&choice, now)?;
        let session = self.state.session().ok_or(NoSession)?;
        let choices_made = session.history().len();
        if let Some(record) = session.history().last().cloned() {
            self.events.emit(GameEvent::ChoiceMade {
                record,
                choices_made,
            });
        }
        self.events.emit(GameEvent::FavorabilityChanged {
            old: change.old,
            new: change.new,
            delta: change.delta,
        });

        let next = next_scene_id(self.rules(), change.new, &choice);
        debug!(
            index,
            favorability = change.new.value(),
            requested = choice.next_scene_id,
            next,
            "choice applied"
        );

        self.scene = None;
        Ok(self.load_scene(next).await)
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.set_paused(true)
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.set_paused(false)
    }

    pub fn is_paused(&self) -> bool {
        self.state.session().is_some_and(|s| s.is_paused())
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), EngineError> {
        if self.is_paused() == paused {
            return Ok(());
        }
        self.state.set_paused(paused)?;
        self.events.emit(GameEvent::PauseChanged { paused });
        Ok(())
    }

    /// Submit the finished game to the leaderboard under `nickname`.
    ///
    /// Validation happens before any request. The request itself is sent once.
    pub async fn submit_ranking(&mut self, nickname: &str) -> Result<RankingReceipt, EngineError> {
        let outcome = self.outcome.as_ref().ok_or(EngineError::GameNotFinished)?;
        if let Some(rank) = self.submitted_rank {
            return Err(EngineError::AlreadySubmitted(rank));
        }

        let nickname = validate_nickname(nickname)?;
        let result = &outcome.result;
        let submission = RankingSubmission {
            nickname: nickname.clone(),
            score: validate_score(i64::from(result.score))?,
            scenario_title: result.scenario_title.clone(),
            play_time: result.play_time_secs,
            choices_count: result.choices_count as u32,
        };

        let receipt = self.backend.submit_ranking(&submission).await?;
        info!(nickname = %nickname, rank = receipt.rank, "ranking submitted");
        self.submitted_rank = Some(receipt.rank);
        self.events.emit(GameEvent::RankingSubmitted {
            nickname,
            rank: receipt.rank,
        });
        Ok(receipt)
    }

    pub async fn rankings(
        &self,
        filter: Option<&RankingFilter>,
    ) -> Result<Vec<RankingEntry>, EngineError> {
        Ok(self.backend.get_rankings(filter).await?)
    }

    /// Scenarios offered by the server, or the built-in catalog if it has none.
    pub async fn scenarios(&self) -> Vec<ScenarioSummary> {
        match self.backend.get_scenarios().await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => self.catalog.summaries(),
            Err(e) => {
                warn!(error = %e, "scenario list unavailable, using built-in catalog");
                self.catalog.summaries()
            }
        }
    }

    fn begin(&mut self) {
        self.scene = None;
        self.outcome = None;
        self.submitted_rank = None;
    }

    async fn load_scene(&mut self, scene_id: SceneId) -> Progress {
        self.phase = Phase::Loading;
        let scenario_id = match self.state.session() {
            Some(session) => session.scenario_id().to_string(),
            None => String::new(),
        };

        match self.backend.get_scene(&scenario_id, scene_id).await {
            Ok(Some(scene)) => {
                // Only a successfully loaded scene becomes current.
                if self.state.set_current_scene(scene_id).is_err() {
                    warn!(scene_id, "scene loaded without a session");
                }
                self.events.emit(GameEvent::SceneLoaded {
                    scene_id,
                    terminal: scene.is_terminal(),
                });

                if scene.is_terminal() {
                    debug!(scene_id, "terminal scene reached");
                    return self.finish(Some(scene), EndReason::TerminalScene).await;
                }

                self.phase = Phase::AwaitingChoice;
                self.scene = Some(scene.clone());
                self.state.persist(self.now()).await;
                Progress::Continue(scene)
            }
            Ok(None) => {
                info!(%scenario_id, scene_id, "no more content");
                self.finish(None, EndReason::ContentExhausted).await
            }
            Err(e) => {
                let message = e
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string());
                warn!(%scenario_id, scene_id, error = %e, "scene failed to load, ending game");
                self.events.emit(GameEvent::SceneLoadFailed {
                    scene_id,
                    message: message.clone(),
                });
                self.finish(None, EndReason::LoadFailed(message)).await
            }
        }
    }

    async fn finish(&mut self, final_scene: Option<Scene>, reason: EndReason) -> Progress {
        let now = self.now();
        let result = match self.state.session() {
            Some(session) => summarize(session, self.state.rules(), &self.catalog, now),
            None => {
                let empty = GameSession::new("", self.state.rules(), now);
                summarize(&empty, self.state.rules(), &self.catalog, now)
            }
        };

        self.state.clear_saved().await;
        self.phase = Phase::Ended;
        self.scene = None;

        info!(
            scenario_id = %result.scenario_id,
            score = result.score,
            choices = result.choices_count,
            reason = ?reason,
            "game ended"
        );

        let outcome = Outcome {
            final_scene,
            result: result.clone(),
            reason: reason.clone(),
        };
        self.outcome = Some(outcome.clone());
        self.events.emit(GameEvent::SessionEnded { result, reason });
        Progress::Finished(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::persist::{MemorySaveStore, SAVE_KEY};
    use crate::testing::MockBackend;
    use lovesim_api::Choice;
    use std::sync::Mutex;

    fn scene(line: &str, cards: Vec<Choice>) -> Scene {
        Scene {
            scene_id: None,
            ai_line: line.into(),
            character_image: None,
            character_mood: None,
            user_cards: cards,
        }
    }

    fn engine(backend: MockBackend) -> GameEngine<MockBackend, MemorySaveStore> {
        GameEngine::new(backend, MemorySaveStore::new(), GameRules::default())
    }

    #[tokio::test]
    async fn test_choose_before_start_is_rejected() {
        let mut engine = engine(MockBackend::new());
        assert!(matches!(
            engine.choose(0).await,
            Err(EngineError::NoPendingChoice)
        ));
        assert!(matches!(engine.pause(), Err(EngineError::NoSession(_))));
    }

    #[tokio::test]
    async fn test_invalid_index_leaves_state_untouched() {
        let backend = MockBackend::new().with_scene(
            "teacher",
            1,
            scene("Hello", vec![Choice::new("Hi", 5, 2)]),
        );
        let mut engine = engine(backend);
        engine.start_new_game("teacher").await;

        let err = engine.choose(3).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidChoice {
                index: 3,
                available: 1
            }
        ));
        assert_eq!(engine.session().unwrap().history().len(), 0);
        assert_eq!(engine.phase(), Phase::AwaitingChoice);
    }

    #[tokio::test]
    async fn test_events_for_a_choice() {
        let backend = MockBackend::new()
            .with_scene("teacher", 1, scene("Hello", vec![Choice::new("Hi", 5, 2)]))
            .with_scene("teacher", 2, scene("Bye", vec![]));
        let log = Arc::new(Mutex::new(EventLog::default()));
        let mut engine = engine(backend);
        engine.subscribe(Arc::clone(&log));

        engine.start_new_game("teacher").await;
        let progress = engine.choose(0).await.unwrap();
        assert!(progress.is_finished());

        let log = log.lock().unwrap();
        let events = &log.events;
        assert!(matches!(events[0], GameEvent::GameStarted { resumed: false, .. }));
        assert!(matches!(events[1], GameEvent::SceneLoaded { scene_id: 1, terminal: false }));
        assert!(matches!(events[2], GameEvent::ChoiceMade { choices_made: 1, .. }));
        assert!(matches!(events[3], GameEvent::FavorabilityChanged { delta: 5, .. }));
        assert!(matches!(events[4], GameEvent::SceneLoaded { scene_id: 2, terminal: true }));
        assert!(matches!(
            events[5],
            GameEvent::SessionEnded {
                reason: EndReason::TerminalScene,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_choose_after_end_is_rejected() {
        let backend = MockBackend::new().with_scene("teacher", 1, scene("The end", vec![]));
        let mut engine = engine(backend);
        let progress = engine.start_new_game("teacher").await;

        assert!(progress.is_finished());
        assert!(matches!(engine.choose(0).await, Err(EngineError::GameFinished)));
    }

    #[tokio::test]
    async fn test_pause_toggles_once() {
        let backend = MockBackend::new().with_scene(
            "teacher",
            1,
            scene("Hello", vec![Choice::new("Hi", 5, 2)]),
        );
        let log = Arc::new(Mutex::new(EventLog::default()));
        let mut engine = engine(backend);
        engine.subscribe(Arc::clone(&log));
        engine.start_new_game("teacher").await;

        engine.pause().unwrap();
        engine.pause().unwrap();
        assert!(engine.is_paused());
        engine.resume().unwrap();
        assert!(!engine.is_paused());

        let pauses = log
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::PauseChanged { .. }))
            .count();
        assert_eq!(pauses, 2);
    }

    #[tokio::test]
    async fn test_progress_is_saved_after_each_loaded_scene() {
        let backend = MockBackend::new()
            .with_scene("teacher", 1, scene("One", vec![Choice::new("Go", 5, 2)]))
            .with_scene("teacher", 2, scene("Two", vec![Choice::new("Go", 5, 3)]));
        let mut engine = engine(backend);

        engine.start_new_game("teacher").await;
        assert!(engine.save_store().contains(SAVE_KEY).await);
        engine.choose(0).await.unwrap();

        let raw = engine.save_store().load(SAVE_KEY).await.unwrap().unwrap();
        let saved: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved["state"]["current_scene_id"], 2);
        assert_eq!(saved["state"]["favorability"], 55);
    }

    #[tokio::test]
    async fn test_submit_before_end_is_rejected() {
        let backend = MockBackend::new().with_scene(
            "teacher",
            1,
            scene("Hello", vec![Choice::new("Hi", 5, 2)]),
        );
        let mut engine = engine(backend);
        engine.start_new_game("teacher").await;

        assert!(matches!(
            engine.submit_ranking("player").await,
            Err(EngineError::GameNotFinished)
        ));
    }

    #[tokio::test]
    async fn test_scenarios_fall_back_to_catalog() {
        let engine = engine(MockBackend::new().failing_scenarios());
        let list = engine.scenarios().await;
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].name, "female-friend");
    }
}
