//! Save storage for sessions and statistics.
//!
//! Saves are small JSON documents addressed by key. The [`SaveStore`] trait
//! abstracts where they live: [`FileSaveStore`] writes one file per key,
//! [`MemorySaveStore`] keeps them in memory for tests and ephemeral play.

use crate::state::GameSession;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// Key of the in-progress session.
pub const SAVE_KEY: &str = "loveSimulatorSave";

/// Key of the accumulated play statistics.
pub const STATS_KEY: &str = "loveSimulatorStats";

/// Current save format version. Saves with any other version are ignored.
pub const SAVE_VERSION: u32 = 1;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Save is {age_minutes} minutes old, limit is {limit_minutes}")]
    Stale { age_minutes: i64, limit_minutes: i64 },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Key/value storage for saves.
#[async_trait]
pub trait SaveStore: Send + Sync {
    /// Read a value, `None` if the key was never written.
    async fn load(&self, key: &str) -> Result<Option<String>, PersistError>;

    async fn store(&self, key: &str, value: &str) -> Result<(), PersistError>;

    /// Delete a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), PersistError>;
}

/// Envelope written under [`SAVE_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub state: GameSession,
}

impl SavedGame {
    pub fn new(state: GameSession, now: DateTime<Utc>) -> Self {
        Self {
            version: SAVE_VERSION,
            timestamp: now,
            state,
        }
    }

    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a save and accept it only if its version matches and it is
    /// younger than `freshness`.
    pub fn decode(
        raw: &str,
        now: DateTime<Utc>,
        freshness: chrono::Duration,
    ) -> Result<GameSession, PersistError> {
        // Header first: a save from another version is a mismatch, not a parse error.
        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            #[serde(with = "chrono::serde::ts_milliseconds")]
            timestamp: DateTime<Utc>,
        }

        let partial: Partial = serde_json::from_str(raw)?;
        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        let age = now - partial.timestamp;
        if age >= freshness {
            return Err(PersistError::Stale {
                age_minutes: age.num_minutes(),
                limit_minutes: freshness.num_minutes(),
            });
        }

        let saved: Self = serde_json::from_str(raw)?;
        Ok(saved.state)
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect::<String>();
        self.dir.join(format!("{sanitized}.json"))
    }
}

#[async_trait]
impl SaveStore for FileSaveStore {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail.
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_fail_writes(true);
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    fn check_writable(&self) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(PersistError::Unavailable("writes disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SaveStore for MemorySaveStore {
    async fn load(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.check_writable()?;
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.check_writable()?;
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
