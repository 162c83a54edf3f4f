//! Achieved-endings tracking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Receives a notification whenever the player reaches an ending page.
pub trait EndingsTracker {
    fn add_achieved_ending(&mut self, page_id: &str);

    fn has_achieved(&self, page_id: &str) -> bool;

    /// Achieved ending ids, sorted.
    fn achieved(&self) -> Vec<String>;
}

/// In-memory set of achieved endings.
///
/// Serializable so a host can keep it next to the other save records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievedEndings {
    endings: BTreeSet<String>,
}

impl AchievedEndings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.endings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endings.is_empty()
    }
}

impl EndingsTracker for AchievedEndings {
    fn add_achieved_ending(&mut self, page_id: &str) {
        if self.endings.insert(page_id.to_string()) {
            log::info!("Ending achieved: {page_id}");
        }
    }

    fn has_achieved(&self, page_id: &str) -> bool {
        self.endings.contains(page_id)
    }

    fn achieved(&self) -> Vec<String> {
        self.endings.iter().cloned().collect()
    }
}
