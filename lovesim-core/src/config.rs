//! Game rules, runtime configuration and the built-in scenario catalog.

use lovesim_api::SceneId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Invalid rules: {0}")]
    InvalidRules(String),
}

/// Favorability bands that drive branching and ending titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FavorabilityThresholds {
    /// Below this the session is forced into the game-over scene.
    pub game_over: u8,
    pub neutral_ending: u8,
    pub good_ending: u8,
    /// Also the bar for the decisive-moment branch.
    pub perfect_ending: u8,
}

impl Default for FavorabilityThresholds {
    fn default() -> Self {
        Self {
            game_over: 30,
            neutral_ending: 40,
            good_ending: 60,
            perfect_ending: 70,
        }
    }
}

/// Scene ids with special meaning to the progression engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialScenes {
    pub first: SceneId,
    pub game_over: SceneId,
    pub perfect_ending: SceneId,
    pub bad_ending: SceneId,
    /// Sentinel `next_scene_id` resolved by favorability, never loaded itself.
    pub decisive_moment: SceneId,
}

impl Default for SpecialScenes {
    fn default() -> Self {
        Self {
            first: 1,
            game_over: 99,
            perfect_ending: 31,
            bad_ending: 100,
            decisive_moment: 999,
        }
    }
}

/// Tunable game rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub initial_favorability: u8,
    pub thresholds: FavorabilityThresholds,
    pub scenes: SpecialScenes,
    /// A saved session at least this old is not restored.
    pub save_freshness_hours: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            initial_favorability: 50,
            thresholds: FavorabilityThresholds::default(),
            scenes: SpecialScenes::default(),
            save_freshness_hours: 24,
        }
    }
}

impl GameRules {
    /// Load rules from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules: Self = serde_json::from_str(&content)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn save_freshness(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.save_freshness_hours))
    }

    /// Check the rules are internally consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        for (name, value) in [
            ("initial_favorability", self.initial_favorability),
            ("game_over", t.game_over),
            ("neutral_ending", t.neutral_ending),
            ("good_ending", t.good_ending),
            ("perfect_ending", t.perfect_ending),
        ] {
            if value > 100 {
                return Err(ConfigError::InvalidRules(format!(
                    "{name} must be within 0..=100, got {value}"
                )));
            }
        }

        if !(t.game_over <= t.neutral_ending
            && t.neutral_ending <= t.good_ending
            && t.good_ending <= t.perfect_ending)
        {
            return Err(ConfigError::InvalidRules(format!(
                "thresholds must be ordered game_over <= neutral <= good <= perfect, got {} / {} / {} / {}",
                t.game_over, t.neutral_ending, t.good_ending, t.perfect_ending
            )));
        }

        let s = &self.scenes;
        let special = [
            ("game_over", s.game_over),
            ("perfect_ending", s.perfect_ending),
            ("bad_ending", s.bad_ending),
            ("decisive_moment", s.decisive_moment),
        ];
        for (i, (a_name, a)) in special.iter().enumerate() {
            for (b_name, b) in &special[i + 1..] {
                if a == b {
                    return Err(ConfigError::InvalidRules(format!(
                        "scene ids {a_name} and {b_name} are both {a}"
                    )));
                }
            }
        }

        if s.first == s.decisive_moment {
            return Err(ConfigError::InvalidRules(format!(
                "first scene {} cannot be the decisive-moment sentinel",
                s.first
            )));
        }

        if self.save_freshness_hours == 0 {
            return Err(ConfigError::InvalidRules(
                "save_freshness_hours must be positive".into(),
            ));
        }

        Ok(())
    }
}

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SAVE_DIR: &str = "saves";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for a game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub api_url: String,
    pub save_dir: PathBuf,
    pub request_timeout: Duration,
    pub rules: GameRules,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            rules: GameRules::default(),
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `LOVESIM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup("LOVESIM_API_URL").filter(|v| !v.trim().is_empty()) {
            config.api_url = url.trim().to_string();
        }
        if let Some(dir) = lookup("LOVESIM_SAVE_DIR").filter(|v| !v.trim().is_empty()) {
            config.save_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("LOVESIM_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidEnv {
                    name: "LOVESIM_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = lookup("LOVESIM_RULES").filter(|v| !v.trim().is_empty()) {
            config.rules = GameRules::from_file(path)?;
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }
}

/// Built-in metadata for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub character: &'static str,
    /// 1 (easy) to 5 (hard).
    pub difficulty: u8,
    pub description: &'static str,
}

const BUILTIN_SCENARIOS: &[ScenarioInfo] = &[
    ScenarioInfo {
        id: "female-friend",
        title: "여사친에게 다가가기",
        character: "수진",
        difficulty: 3,
        description: "친구에서 연인으로 발전하는 세심한 관계 시뮬레이션",
    },
    ScenarioInfo {
        id: "male-friend",
        title: "남사친에게 다가가기",
        character: "준호",
        difficulty: 3,
        description: "남성 친구와의 관계 발전 스토리",
    },
    ScenarioInfo {
        id: "teacher",
        title: "김민수 선생님의 최애가 되기",
        character: "김민수 선생님",
        difficulty: 3,
        description: "NLP반 천재 강사님의 마음을 사로잡는 여정",
    },
];

/// Lookup table of known scenarios.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioCatalog {
    scenarios: &'static [ScenarioInfo],
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ScenarioCatalog {
    pub fn builtin() -> Self {
        Self {
            scenarios: BUILTIN_SCENARIOS,
        }
    }

    pub fn get(&self, id: &str) -> Option<&'static ScenarioInfo> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// Display title for a scenario, falling back to its id.
    pub fn title_for<'a>(&self, id: &'a str) -> &'a str {
        match self.get(id) {
            Some(info) => info.title,
            None => id,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ScenarioInfo> {
        self.scenarios.iter()
    }

    /// Catalog entries in the shape the server returns them.
    pub fn summaries(&self) -> Vec<lovesim_api::ScenarioSummary> {
        self.iter()
            .map(|s| lovesim_api::ScenarioSummary {
                name: s.id.to_string(),
                title: s.title.to_string(),
                description: Some(s.description.to_string()),
            })
            .collect()
    }
}
