//! Debug access to a story state.
//!
//! For debug tooling only. These calls skip the bookkeeping gameplay relies
//! on: no link scripts run and no endings are recorded.

use crate::persist::StoredState;
use crate::state::StoryState;

/// Borrowed debug handle, obtained from [`StoryState::debug`].
pub struct DebugView<'a> {
    state: &'a mut StoryState,
}

impl<'a> DebugView<'a> {
    pub(crate) fn new(state: &'a mut StoryState) -> Self {
        Self { state }
    }

    /// Deep copy of the persisted state.
    pub fn full_state(&self) -> StoredState {
        self.state.stored().clone()
    }

    /// Strip every lock entry for `action_name` on `page_id`.
    pub fn remove_action(&mut self, page_id: &str, action_name: &str) {
        self.state.unlock_action(page_id, action_name);
    }
}
