//! End-of-game summaries.

use crate::config::{FavorabilityThresholds, GameRules, ScenarioCatalog};
use crate::state::{ChoiceRecord, GameSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ending band a final score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndingBand {
    Perfect,
    Good,
    Neutral,
    Poor,
}

impl EndingBand {
    pub fn for_score(score: u8, thresholds: &FavorabilityThresholds) -> Self {
        if score >= thresholds.perfect_ending {
            EndingBand::Perfect
        } else if score >= thresholds.good_ending {
            EndingBand::Good
        } else if score >= thresholds.neutral_ending {
            EndingBand::Neutral
        } else {
            EndingBand::Poor
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            EndingBand::Perfect => "💖 Perfect Ending! 💖",
            EndingBand::Good => "💚 Happy Ending! 💚",
            EndingBand::Neutral => "💛 Ambiguous Ending 💛",
            EndingBand::Poor => "💔 Bittersweet Ending 💔",
        }
    }

    pub fn advice(self) -> &'static str {
        match self {
            EndingBand::Perfect => {
                "A true master of romance! You completely captured their heart."
            }
            EndingBand::Good => {
                "You built a good relationship. A little more effort and it could be perfect."
            }
            EndingBand::Neutral => {
                "More than friends, not quite lovers. Try to understand their feelings a bit better."
            }
            EndingBand::Poor => {
                "The relationship needs work. Put yourself in their shoes and try again!"
            }
        }
    }
}

/// Final summary of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub scenario_id: String,
    pub scenario_title: String,
    pub score: u8,
    pub band: EndingBand,
    pub title: String,
    pub advice: String,
    pub best_choice: Option<ChoiceRecord>,
    pub worst_choice: Option<ChoiceRecord>,
    pub play_time_secs: u64,
    pub choices_count: usize,
}

/// Summarize a session as of `now`.
pub fn summarize(
    session: &GameSession,
    rules: &GameRules,
    catalog: &ScenarioCatalog,
    now: DateTime<Utc>,
) -> GameResult {
    let score = session.favorability().value();
    let band = EndingBand::for_score(score, &rules.thresholds);

    GameResult {
        scenario_id: session.scenario_id().to_string(),
        scenario_title: catalog.title_for(session.scenario_id()).to_string(),
        score,
        band,
        title: band.title().to_string(),
        advice: band.advice().to_string(),
        best_choice: best_choice(session.history()).cloned(),
        worst_choice: worst_choice(session.history()).cloned(),
        play_time_secs: session.elapsed_secs(now),
        choices_count: session.history().len(),
    }
}

/// The choice with the largest positive delta. The earliest one wins ties.
pub fn best_choice(history: &[ChoiceRecord]) -> Option<&ChoiceRecord> {
    history
        .iter()
        .filter(|c| c.favorability_delta > 0)
        .fold(None, |best: Option<&ChoiceRecord>, c| match best {
            Some(b) if b.favorability_delta >= c.favorability_delta => Some(b),
            _ => Some(c),
        })
}

/// The choice with the most negative delta. The earliest one wins ties.
pub fn worst_choice(history: &[ChoiceRecord]) -> Option<&ChoiceRecord> {
    history
        .iter()
        .filter(|c| c.favorability_delta < 0)
        .fold(None, |worst: Option<&ChoiceRecord>, c| match worst {
            Some(w) if w.favorability_delta <= c.favorability_delta => Some(w),
            _ => Some(c),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemorySaveStore;
    use crate::state::GameStateStore;
    use chrono::TimeZone;
    use lovesim_api::Choice;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn record(text: &str, delta: i32) -> ChoiceRecord {
        ChoiceRecord {
            scene_id: 1,
            text: text.into(),
            favorability_delta: delta,
            timestamp: t0(),
        }
    }

    fn played(scenario: &str, deltas: &[i32]) -> GameSession {
        let mut store = GameStateStore::new(MemorySaveStore::new(), GameRules::default());
        store.reset(scenario, t0());
        for (i, delta) in deltas.iter().enumerate() {
            store
                .record_choice(&Choice::new(format!("choice {i}"), *delta, 2), t0())
                .unwrap();
        }
        store.session().cloned().unwrap()
    }

    #[test]
    fn test_band_boundaries() {
        let t = FavorabilityThresholds::default();
        assert_eq!(EndingBand::for_score(100, &t), EndingBand::Perfect);
        assert_eq!(EndingBand::for_score(70, &t), EndingBand::Perfect);
        assert_eq!(EndingBand::for_score(69, &t), EndingBand::Good);
        assert_eq!(EndingBand::for_score(60, &t), EndingBand::Good);
        assert_eq!(EndingBand::for_score(59, &t), EndingBand::Neutral);
        assert_eq!(EndingBand::for_score(40, &t), EndingBand::Neutral);
        assert_eq!(EndingBand::for_score(39, &t), EndingBand::Poor);
        assert_eq!(EndingBand::for_score(0, &t), EndingBand::Poor);
    }

    #[test]
    fn test_best_and_worst_absent() {
        assert!(best_choice(&[]).is_none());
        assert!(worst_choice(&[]).is_none());

        let neutral = [record("shrug", 0), record("nod", 0)];
        assert!(best_choice(&neutral).is_none());
        assert!(worst_choice(&neutral).is_none());

        let only_positive = [record("smile", 5), record("gift", 10)];
        assert_eq!(best_choice(&only_positive).unwrap().text, "gift");
        assert!(worst_choice(&only_positive).is_none());
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let history = [
            record("first high", 10),
            record("rude", -15),
            record("second high", 10),
            record("ruder", -15),
        ];
        assert_eq!(best_choice(&history).unwrap().text, "first high");
        assert_eq!(worst_choice(&history).unwrap().text, "rude");
    }

    #[test]
    fn test_summarize() {
        let session = played("female-friend", &[25, -30, 15, -20]);
        let result = summarize(
            &session,
            &GameRules::default(),
            &ScenarioCatalog::builtin(),
            t0() + chrono::Duration::milliseconds(95_700),
        );

        assert_eq!(result.score, 40);
        assert_eq!(result.band, EndingBand::Neutral);
        assert_eq!(result.title, EndingBand::Neutral.title());
        assert_eq!(result.best_choice.unwrap().text, "choice 0");
        assert_eq!(result.worst_choice.unwrap().text, "choice 1");
        assert_eq!(result.play_time_secs, 95);
        assert_eq!(result.choices_count, 4);
        assert_eq!(result.scenario_title, "여사친에게 다가가기");
    }

    #[test]
    fn test_unknown_scenario_title_falls_back_to_id() {
        let session = played("custom-pack", &[]);
        let result = summarize(
            &session,
            &GameRules::default(),
            &ScenarioCatalog::builtin(),
            t0(),
        );
        assert_eq!(result.scenario_title, "custom-pack");
        assert_eq!(result.score, 50);
        assert_eq!(result.band, EndingBand::Neutral);
        assert_eq!(result.play_time_secs, 0);
    }
}
