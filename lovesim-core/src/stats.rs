//! Lifetime play statistics, accumulated from finished games.

use crate::events::{GameEvent, SessionObserver};
use crate::persist::{PersistError, SaveStore, STATS_KEY};
use crate::result::GameResult;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayStatistics {
    pub games_played: u32,
    pub total_play_time_secs: u64,
    pub highest_score: u8,
    pub total_choices: u64,
    /// Scenario ids finished at least once, in first-completion order.
    pub completed_scenarios: Vec<String>,
}

impl PlayStatistics {
    pub fn record(&mut self, result: &GameResult) {
        self.games_played += 1;
        self.total_play_time_secs += result.play_time_secs;
        self.highest_score = self.highest_score.max(result.score);
        self.total_choices += result.choices_count as u64;
        if !self.completed_scenarios.contains(&result.scenario_id) {
            self.completed_scenarios.push(result.scenario_id.clone());
        }
    }

    /// Load saved statistics. Missing or unreadable data yields empty statistics.
    pub async fn load<S: SaveStore + ?Sized>(store: &S) -> Self {
        match store.load(STATS_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring unreadable statistics");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "failed to read statistics");
                Self::default()
            }
        }
    }

    pub async fn save<S: SaveStore + ?Sized>(&self, store: &S) -> Result<(), PersistError> {
        let raw = serde_json::to_string(self)?;
        store.store(STATS_KEY, &raw).await
    }
}

impl SessionObserver for PlayStatistics {
    fn on_event(&mut self, event: &GameEvent) {
        if let GameEvent::SessionEnded { result, .. } = event {
            self.record(result);
        }
    }
}
