//! Love Simulator game engine.
//!
//! This crate provides:
//! - The session state store with clamped favorability and save/restore
//! - The scene progression engine with game-over and decisive-moment branching
//! - End-of-game results, statistics and achievements
//! - Configuration and input validation
//!
//! # Quick Start
//!
//! ```ignore
//! use lovesim_core::{GameConfig, GameEngine, Progress};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::from_env()?;
//!     let mut engine = GameEngine::from_config(&config)?;
//!
//!     let mut progress = engine.start_new_game("female-friend").await;
//!     while let Progress::Continue(scene) = progress {
//!         println!("{}", scene.ai_line);
//!         progress = engine.choose(0).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod achievements;
pub mod backend;
pub mod config;
pub mod engine;
pub mod events;
pub mod persist;
pub mod progression;
pub mod result;
pub mod state;
pub mod stats;
pub mod testing;
pub mod validation;

pub use achievements::{Achievement, AchievementTracker};
pub use backend::ScenarioBackend;
pub use config::{ConfigError, GameConfig, GameRules, ScenarioCatalog, ScenarioInfo};
pub use engine::{EndReason, EngineError, GameEngine, Outcome, Phase, Progress};
pub use events::{EventBus, GameEvent, SessionObserver};
pub use persist::{FileSaveStore, MemorySaveStore, PersistError, SaveStore};
pub use result::{EndingBand, GameResult};
pub use state::{ChoiceRecord, Favorability, GameSession, GameStateStore};
pub use stats::PlayStatistics;
pub use testing::{MockBackend, TestHarness};
pub use validation::ValidationError;

// Wire types used throughout the public API.
pub use lovesim_api::{Choice, RankingEntry, RankingFilter, RankingReceipt, Scene, SceneId};
