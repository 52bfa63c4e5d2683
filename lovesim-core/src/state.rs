//! Session state and the store that owns it.
//!
//! The [`GameStateStore`] is the only place a [`GameSession`] is mutated.
//! Favorability changes go through [`Favorability::saturating_add`], so the
//! score can never leave `0..=100`.

use crate::config::GameRules;
use crate::persist::{PersistError, SaveStore, SavedGame, SAVE_KEY};
use chrono::{DateTime, Utc};
use lovesim_api::{Choice, SceneId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Returned by store operations that need a session when none exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("No active session")]
pub struct NoSession;

/// Affection score, always within `0..=100`.
///
/// Deserializing an out-of-range number clamps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Favorability(u8);

impl Favorability {
    pub const MIN: Favorability = Favorability(0);
    pub const MAX: Favorability = Favorability(100);

    pub fn new(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Apply a signed change, clamping at both ends.
    pub fn saturating_add(self, delta: i32) -> Self {
        Self::new(i64::from(self.0) + i64::from(delta))
    }
}

impl From<i64> for Favorability {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Favorability> for i64 {
    fn from(value: Favorability) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for Favorability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A choice the player made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub scene_id: SceneId,
    pub text: String,
    pub favorability_delta: i32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Before/after values of a favorability update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavorabilityChange {
    pub old: Favorability,
    pub new: Favorability,
    /// The requested delta, before clamping.
    pub delta: i32,
}

/// One play-through of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    session_id: Uuid,
    scenario_id: String,
    current_scene_id: SceneId,
    favorability: Favorability,
    history: Vec<ChoiceRecord>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    start_time: DateTime<Utc>,
    #[serde(default)]
    paused: bool,
}

impl GameSession {
    pub fn new(scenario_id: impl Into<String>, rules: &GameRules, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            scenario_id: scenario_id.into(),
            current_scene_id: rules.scenes.first,
            favorability: Favorability::new(i64::from(rules.initial_favorability)),
            history: Vec::new(),
            start_time: now,
            paused: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    pub fn current_scene_id(&self) -> SceneId {
        self.current_scene_id
    }

    pub fn favorability(&self) -> Favorability {
        self.favorability
    }

    pub fn history(&self) -> &[ChoiceRecord] {
        &self.history
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whole seconds since the session started, never negative.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.start_time).num_seconds().max(0) as u64
    }
}

/// Owns the active session and its saved copy.
pub struct GameStateStore<S> {
    store: S,
    rules: GameRules,
    session: Option<GameSession>,
}

impl<S: SaveStore> GameStateStore<S> {
    pub fn new(store: S, rules: GameRules) -> Self {
        Self {
            store,
            rules,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn save_store(&self) -> &S {
        &self.store
    }

    /// Start a fresh session, discarding any in-memory one.
    pub fn reset(&mut self, scenario_id: &str, now: DateTime<Utc>) -> &GameSession {
        let session = GameSession::new(scenario_id, &self.rules, now);
        info!(session_id = %session.session_id, scenario_id, "new session");
        self.session.insert(session)
    }

    /// Append a record for the current scene and apply the choice's delta.
    pub fn record_choice(
        &mut self,
        choice: &Choice,
        now: DateTime<Utc>,
    ) -> Result<FavorabilityChange, NoSession> {
        let session = self.session.as_mut().ok_or(NoSession)?;

        session.history.push(ChoiceRecord {
            scene_id: session.current_scene_id,
            text: choice.text.clone(),
            favorability_delta: choice.favorability_delta,
            timestamp: now,
        });

        let old = session.favorability;
        session.favorability = old.saturating_add(choice.favorability_delta);

        Ok(FavorabilityChange {
            old,
            new: session.favorability,
            delta: choice.favorability_delta,
        })
    }

    pub fn set_current_scene(&mut self, scene_id: SceneId) -> Result<(), NoSession> {
        let session = self.session.as_mut().ok_or(NoSession)?;
        session.current_scene_id = scene_id;
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<(), NoSession> {
        let session = self.session.as_mut().ok_or(NoSession)?;
        session.paused = paused;
        Ok(())
    }

    /// Save the active session. Failures are logged, never returned.
    pub async fn persist(&self, now: DateTime<Utc>) -> bool {
        let Some(session) = &self.session else {
            return false;
        };

        let result = match SavedGame::new(session.clone(), now).encode() {
            Ok(raw) => self.store.store(SAVE_KEY, &raw).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                debug!(session_id = %session.session_id, "session saved");
                true
            }
            Err(e) => {
                warn!(session_id = %session.session_id, error = %e, "failed to save session");
                false
            }
        }
    }

    /// Load the saved session if it is present, readable and fresh.
    ///
    /// Anything else counts as "no saved session".
    pub async fn restore(&mut self, now: DateTime<Utc>) -> Option<&GameSession> {
        let session = self.peek_saved(now).await?;
        info!(
            session_id = %session.session_id,
            scenario_id = %session.scenario_id,
            scene_id = session.current_scene_id,
            "restored saved session"
        );
        Some(self.session.insert(session))
    }

    /// Read the saved session without making it current.
    pub async fn peek_saved(&self, now: DateTime<Utc>) -> Option<GameSession> {
        let raw = match self.store.load(SAVE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read saved session");
                return None;
            }
        };

        match SavedGame::decode(&raw, now, self.rules.save_freshness()) {
            Ok(session) => Some(session),
            Err(e @ PersistError::Stale { .. }) => {
                info!(error = %e, "ignoring saved session");
                None
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable saved session");
                None
            }
        }
    }

    /// Remove the saved session. Failures are logged.
    pub async fn clear_saved(&self) {
        if let Err(e) = self.store.remove(SAVE_KEY).await {
            warn!(error = %e, "failed to clear saved session");
        }
    }
}
