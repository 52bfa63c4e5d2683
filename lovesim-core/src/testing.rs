//! Testing utilities for the game engine.
//!
//! This module provides tools for integration testing:
//! - `MockBackend` for deterministic scenes and rankings without a server
//! - `TestHarness` for scripted play-throughs with a controllable clock
//! - `scene` and `ending` helpers for building content

use crate::backend::ScenarioBackend;
use crate::config::GameRules;
use crate::engine::{EngineError, GameEngine, Progress};
use crate::events::{EventLog, GameEvent};
use crate::persist::MemorySaveStore;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lovesim_api::{
    Choice, Error, RankingEntry, RankingFilter, RankingReceipt, RankingSubmission,
    ScenarioSummary, Scene, SceneId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A scene offering `cards`.
pub fn scene(ai_line: impl Into<String>, cards: Vec<Choice>) -> Scene {
    Scene {
        scene_id: None,
        ai_line: ai_line.into(),
        character_image: None,
        character_mood: None,
        user_cards: cards,
    }
}

/// A terminal scene.
pub fn ending(ai_line: impl Into<String>) -> Scene {
    scene(ai_line, Vec::new())
}

/// A scripted failure for a mock request.
#[derive(Debug, Clone)]
pub enum MockFailure {
    Network,
    Status { status: u16, message: String },
}

impl MockFailure {
    fn to_error(&self) -> Error {
        match self {
            MockFailure::Network => Error::Network("connection refused".into()),
            MockFailure::Status { status, message } => Error::Api {
                status: *status,
                message: message.clone(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct MockLog {
    scene_requests: Vec<(String, SceneId)>,
    submissions: Vec<RankingSubmission>,
}

/// Backend serving scripted content.
///
/// Unknown scenes are reported as missing. Clones share the request log.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    scenes: HashMap<(String, SceneId), Scene>,
    scene_failures: HashMap<(String, SceneId), MockFailure>,
    scenarios: Vec<ScenarioSummary>,
    scenarios_fail: bool,
    rankings: Vec<RankingEntry>,
    submit_failure: Option<MockFailure>,
    log: Arc<Mutex<MockLog>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scene(mut self, scenario_id: &str, scene_id: SceneId, scene: Scene) -> Self {
        self.scenes.insert((scenario_id.to_string(), scene_id), scene);
        self
    }

    pub fn with_scene_failure(
        mut self,
        scenario_id: &str,
        scene_id: SceneId,
        failure: MockFailure,
    ) -> Self {
        self.scene_failures
            .insert((scenario_id.to_string(), scene_id), failure);
        self
    }

    pub fn with_scenarios(mut self, scenarios: Vec<ScenarioSummary>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn failing_scenarios(mut self) -> Self {
        self.scenarios_fail = true;
        self
    }

    pub fn with_rankings(mut self, rankings: Vec<RankingEntry>) -> Self {
        self.rankings = rankings;
        self
    }

    pub fn with_submit_failure(mut self, failure: MockFailure) -> Self {
        self.submit_failure = Some(failure);
        self
    }

    /// Scene requests received so far, in order.
    pub fn scene_requests(&self) -> Vec<(String, SceneId)> {
        self.log().scene_requests.clone()
    }

    pub fn submissions(&self) -> Vec<RankingSubmission> {
        self.log().submissions.clone()
    }

    fn log(&self) -> MutexGuard<'_, MockLog> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ScenarioBackend for MockBackend {
    async fn get_scene(
        &self,
        scenario_id: &str,
        scene_id: SceneId,
    ) -> Result<Option<Scene>, Error> {
        self.log()
            .scene_requests
            .push((scenario_id.to_string(), scene_id));

        let key = (scenario_id.to_string(), scene_id);
        if let Some(failure) = self.scene_failures.get(&key) {
            return Err(failure.to_error());
        }
        Ok(self.scenes.get(&key).cloned())
    }

    async fn get_scenarios(&self) -> Result<Vec<ScenarioSummary>, Error> {
        if self.scenarios_fail {
            return Err(MockFailure::Network.to_error());
        }
        Ok(self.scenarios.clone())
    }

    async fn get_rankings(
        &self,
        filter: Option<&RankingFilter>,
    ) -> Result<Vec<RankingEntry>, Error> {
        Ok(self
            .rankings
            .iter()
            .filter(|entry| filter.map_or(true, |f| f.matches(entry)))
            .cloned()
            .collect())
    }

    async fn submit_ranking(
        &self,
        submission: &RankingSubmission,
    ) -> Result<RankingReceipt, Error> {
        self.log().submissions.push(submission.clone());
        if let Some(failure) = &self.submit_failure {
            return Err(failure.to_error());
        }

        let rank = self
            .rankings
            .iter()
            .filter(|r| r.scenario_title == submission.scenario_title && r.score > submission.score)
            .count() as u32
            + 1;
        Ok(RankingReceipt {
            rank,
            message: Some("Ranking registered".into()),
        })
    }
}

/// Test harness for scripted play-throughs.
pub struct TestHarness {
    pub engine: GameEngine<MockBackend, MemorySaveStore>,
    backend: MockBackend,
    store: MemorySaveStore,
    clock: Arc<Mutex<DateTime<Utc>>>,
    log: Arc<Mutex<EventLog>>,
}

impl TestHarness {
    /// Harness with default rules, an empty save store and the clock at a fixed instant.
    pub fn new(backend: MockBackend) -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self::build(
            backend,
            MemorySaveStore::new(),
            GameRules::default(),
            Arc::new(Mutex::new(start)),
        )
    }

    pub fn with_rules(backend: MockBackend, rules: GameRules) -> Self {
        let harness = Self::new(backend);
        Self::build(harness.backend, harness.store, rules, harness.clock)
    }

    fn build(
        backend: MockBackend,
        store: MemorySaveStore,
        rules: GameRules,
        clock: Arc<Mutex<DateTime<Utc>>>,
    ) -> Self {
        let log = Arc::new(Mutex::new(EventLog::default()));
        let engine_clock = Arc::clone(&clock);
        let mut engine = GameEngine::new(backend.clone(), store.clone(), rules).with_clock(
            move || *engine_clock.lock().unwrap_or_else(|e| e.into_inner()),
        );
        engine.subscribe(Arc::clone(&log));

        Self {
            engine,
            backend,
            store,
            clock,
            log,
        }
    }

    /// A new harness sharing this one's save store and clock, as after a restart.
    pub fn restart(&self) -> Self {
        Self::build(
            self.backend.clone(),
            self.store.clone(),
            self.engine.rules().clone(),
            Arc::clone(&self.clock),
        )
    }

    pub async fn start(&mut self, scenario_id: &str) -> Progress {
        self.engine.start_new_game(scenario_id).await
    }

    pub async fn choose(&mut self, index: usize) -> Result<Progress, EngineError> {
        self.engine.choose(index).await
    }

    pub fn advance_clock(&self, by: chrono::Duration) {
        let mut now = self.clock.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.engine.now()
    }

    pub fn backend(&self) -> &MockBackend {
        &self.backend
    }

    pub fn store(&self) -> &MemorySaveStore {
        &self.store
    }

    /// Current favorability, 0 without a session.
    pub fn favorability(&self) -> u8 {
        self.engine
            .session()
            .map_or(0, |s| s.favorability().value())
    }

    pub fn history_len(&self) -> usize {
        self.engine.session().map_or(0, |s| s.history().len())
    }

    pub fn current_scene_id(&self) -> Option<SceneId> {
        self.engine.session().map(|s| s.current_scene_id())
    }

    pub fn events(&self) -> Vec<GameEvent> {
        self.log
            .lock()
            .map(|log| log.events.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_serves_and_logs() {
        let backend = MockBackend::new()
            .with_scene("teacher", 1, ending("Class dismissed."))
            .with_scene_failure("teacher", 2, MockFailure::Network);

        assert!(backend.get_scene("teacher", 1).await.unwrap().is_some());
        assert!(backend.get_scene("teacher", 3).await.unwrap().is_none());
        assert!(backend.get_scene("teacher", 2).await.unwrap_err().is_retryable());
        assert_eq!(backend.scene_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_harness_clock() {
        let mut harness = TestHarness::new(
            MockBackend::new().with_scene("teacher", 1, ending("Done")),
        );
        let before = harness.now();
        harness.advance_clock(chrono::Duration::seconds(42));
        assert_eq!(harness.now() - before, chrono::Duration::seconds(42));

        let progress = harness.start("teacher").await;
        assert!(progress.is_finished());
        assert_eq!(harness.events().len(), 3);
    }
}
