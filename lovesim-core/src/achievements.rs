//! Achievements unlocked during play.

use crate::events::{GameEvent, SessionObserver};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstChoice,
    LoveMaster,
    PerfectLove,
}

impl Achievement {
    pub fn id(self) -> &'static str {
        match self {
            Achievement::FirstChoice => "first_choice",
            Achievement::LoveMaster => "love_master",
            Achievement::PerfectLove => "perfect_love",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Achievement::FirstChoice => "First Step",
            Achievement::LoveMaster => "Love Master",
            Achievement::PerfectLove => "Perfect Love",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Achievement::FirstChoice => "Made your first choice",
            Achievement::LoveMaster => "Reached 80 favorability",
            Achievement::PerfectLove => "Reached 100 favorability",
        }
    }
}

/// Tracks unlocked achievements and queues new ones for display.
#[derive(Debug, Default)]
pub struct AchievementTracker {
    unlocked: Vec<Achievement>,
    fresh: Vec<Achievement>,
}

impl AchievementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unlocked(&self) -> &[Achievement] {
        &self.unlocked
    }

    pub fn is_unlocked(&self, achievement: Achievement) -> bool {
        self.unlocked.contains(&achievement)
    }

    /// Drain achievements unlocked since the last call.
    pub fn take_new(&mut self) -> Vec<Achievement> {
        std::mem::take(&mut self.fresh)
    }

    fn unlock(&mut self, achievement: Achievement) {
        if !self.is_unlocked(achievement) {
            self.unlocked.push(achievement);
            self.fresh.push(achievement);
        }
    }
}

impl SessionObserver for AchievementTracker {
    fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::ChoiceMade { choices_made: 1, .. } => self.unlock(Achievement::FirstChoice),
            GameEvent::FavorabilityChanged { new, .. } => {
                if new.value() >= 100 {
                    self.unlock(Achievement::PerfectLove);
                } else if new.value() >= 80 {
                    self.unlock(Achievement::LoveMaster);
                }
            }
            _ => {}
        }
    }
}
