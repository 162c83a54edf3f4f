//! Persisted record formats.
//!
//! [`StoredState`] is the live-state document written to storage after every
//! mutation and copied wholesale into the checkpoint slot. [`SavedGame`] is a
//! standalone export file bundling both, for moving a playthrough between
//! machines.

use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Record is empty")]
    Empty,

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current live-state record version.
pub const STATE_VERSION: u32 = 1;

/// Current export file version.
const SAVE_VERSION: u32 = 1;

fn current_state_version() -> u32 {
    STATE_VERSION
}

fn default_true() -> bool {
    true
}

/// The persisted player state.
///
/// Records written before versioning was introduced have no `version` field
/// and the same shape, so a missing version reads as the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoredState {
    #[serde(default = "current_state_version")]
    pub version: u32,

    /// Visited page ids; the last one is the current page.
    pub history: Vec<String>,

    /// Page id -> names of actions already consumed on that page.
    #[serde(default)]
    pub actions_taken: BTreeMap<String, Vec<String>>,

    /// Item ids in pickup order. Duplicates stack.
    #[serde(default)]
    pub inventory: Vec<String>,

    #[serde(default = "default_true")]
    pub allow_checkpoints: bool,
}

impl StoredState {
    /// Fresh state positioned on `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            history: vec![root.into()],
            actions_taken: BTreeMap::new(),
            inventory: Vec::new(),
            allow_checkpoints: true,
        }
    }

    pub fn encode(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a record, rejecting empty input, malformed JSON, unknown
    /// fields and foreign versions.
    pub fn decode(raw: &str) -> Result<Self, PersistError> {
        if raw.trim().is_empty() {
            return Err(PersistError::Empty);
        }

        let state: Self = serde_json::from_str(raw)?;

        if state.version != STATE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: STATE_VERSION,
                found: state.version,
            });
        }

        Ok(state)
    }

    /// Id of the page the player is on, before any repair.
    pub fn current_page_id(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

/// An exported playthrough: live state plus the checkpoint slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    /// Save format version for compatibility checking.
    pub version: u32,

    /// When the save was created.
    pub saved_at: String,

    pub state: StoredState,

    /// Contents of the checkpoint slot, if one was saved.
    pub checkpoint: Option<StoredState>,

    pub metadata: SaveMetadata,
}

/// Summary shown in a save picker without decoding the full state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub current_page: String,

    pub pages_visited: usize,

    pub inventory_size: usize,

    /// Total number of locked actions across all pages.
    pub actions_taken: usize,

    pub has_checkpoint: bool,

    #[serde(default)]
    pub saved_at: String,
}

impl SavedGame {
    pub fn new(state: StoredState, checkpoint: Option<StoredState>) -> Self {
        let saved_at = unix_now();
        let metadata = SaveMetadata {
            current_page: state.current_page_id().unwrap_or_default().to_string(),
            pages_visited: state.history.len(),
            inventory_size: state.inventory.len(),
            actions_taken: state.actions_taken.values().map(Vec::len).sum(),
            has_checkpoint: checkpoint.is_some(),
            saved_at: saved_at.clone(),
        };

        Self {
            version: SAVE_VERSION,
            saved_at,
            state,
            checkpoint,
            metadata,
        }
    }

    /// Save to a JSON file.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }

    /// Read only the metadata of a save file.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<SaveMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: SaveMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;

        if partial.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: partial.version,
            });
        }

        Ok(partial.metadata)
    }
}

/// A save file found on disk.
#[derive(Debug, Clone)]
pub struct SaveInfo {
    pub path: PathBuf,
    pub metadata: SaveMetadata,
}

/// List readable save files in a directory, newest first.
///
/// Files that are not saves (or are from another version) are skipped.
pub async fn list_saves(dir: impl AsRef<Path>) -> Result<Vec<SaveInfo>, PersistError> {
    let mut saves = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            if let Ok(metadata) = SavedGame::peek_metadata(&path).await {
                saves.push(SaveInfo { path, metadata });
            }
        }
    }

    saves.sort_by(|a, b| b.metadata.saved_at.cmp(&a.metadata.saved_at));
    Ok(saves)
}

/// File name for a named save inside `dir`.
pub fn save_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    let sanitized = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    dir.as_ref().join(format!("{sanitized}.json"))
}

/// Seconds since the Unix epoch, zero-padded so lexical order is time order.
fn unix_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{:012}", now.as_secs())
}
