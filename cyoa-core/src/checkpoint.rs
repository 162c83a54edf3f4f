//! The single checkpoint slot.
//!
//! A checkpoint is a full copy of the live [`StoredState`] kept under its own
//! storage key. It is overwritten wholesale on save and never merged. An
//! empty value means "no checkpoint".

use crate::persist::{PersistError, StoredState};
use crate::storage::{Storage, StorageError};
use thiserror::Error;

/// Errors reading or writing the checkpoint slot.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid checkpoint: {0}")]
    Persist(#[from] PersistError),
}

impl From<CheckpointError> for PersistError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::Storage(e) => PersistError::Storage(e),
            CheckpointError::Persist(e) => e,
        }
    }
}

/// Result of trying to restore the checkpoint.
#[derive(Debug)]
pub enum CheckpointLoad {
    /// Live state was replaced by the checkpoint.
    Loaded,
    /// The slot is empty; live state untouched.
    Missing,
    /// The slot could not be decoded; live state untouched.
    Corrupt(CheckpointError),
}

impl CheckpointLoad {
    /// Whether the caller should navigate onward because nothing was restored.
    pub fn needs_redirect(&self) -> bool {
        !matches!(self, CheckpointLoad::Loaded)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CheckpointLoad::Loaded)
    }
}

/// Handle on the checkpoint key inside a [`Storage`].
#[derive(Debug, Clone)]
pub struct CheckpointSlot {
    key: String,
}

impl CheckpointSlot {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overwrite the slot with `state`.
    pub fn save(&self, storage: &mut dyn Storage, state: &StoredState) -> Result<(), CheckpointError> {
        storage.set(&self.key, &state.encode()?)?;
        Ok(())
    }

    /// Decode the slot. An empty slot is `Ok(None)`.
    pub fn read(&self, storage: &dyn Storage) -> Result<Option<StoredState>, CheckpointError> {
        match storage.get(&self.key)? {
            Some(raw) if !raw.is_empty() => Ok(Some(StoredState::decode(&raw)?)),
            _ => Ok(None),
        }
    }

    /// Whether the slot holds anything, decodable or not.
    pub fn is_present(&self, storage: &dyn Storage) -> bool {
        match storage.get(&self.key) {
            Ok(raw) => raw.is_some_and(|r| !r.is_empty()),
            Err(e) => {
                log::warn!("Could not read checkpoint slot '{}': {e}", self.key);
                false
            }
        }
    }

    /// Empty the slot.
    pub fn clear(&self, storage: &mut dyn Storage) -> Result<(), CheckpointError> {
        storage.set(&self.key, "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_empty_slot() {
        let storage = MemoryStorage::new();
        let slot = CheckpointSlot::new("cp");

        assert!(!slot.is_present(&storage));
        assert!(slot.read(&storage).unwrap().is_none());

        let storage = MemoryStorage::new().with_value("cp", "");
        assert!(!slot.is_present(&storage));
        assert!(slot.read(&storage).unwrap().is_none());
    }

    #[test]
    fn test_save_read_clear() {
        let mut storage = MemoryStorage::new();
        let slot = CheckpointSlot::new("cp");
        let mut state = StoredState::new("main_menu");
        state.inventory.push("torch".to_string());

        slot.save(&mut storage, &state).unwrap();
        assert!(slot.is_present(&storage));
        assert_eq!(slot.read(&storage).unwrap(), Some(state));

        slot.clear(&mut storage).unwrap();
        assert!(!slot.is_present(&storage));
        assert_eq!(storage.get("cp").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_corrupt_slot_is_present_but_unreadable() {
        let storage = MemoryStorage::new().with_value("cp", "{oops");
        let slot = CheckpointSlot::new("cp");

        assert!(slot.is_present(&storage));
        assert!(matches!(
            slot.read(&storage),
            Err(CheckpointError::Persist(PersistError::Json(_)))
        ));
    }

    #[test]
    fn test_needs_redirect() {
        assert!(!CheckpointLoad::Loaded.needs_redirect());
        assert!(CheckpointLoad::Missing.needs_redirect());
        assert!(CheckpointLoad::Corrupt(PersistError::Empty.into()).needs_redirect());
    }
}
