//! Change notifications for whatever renders the story.
//!
//! The state engine publishes a [`StateEvent`] after each mutation. Sending
//! never blocks; with no subscribers the event is simply dropped.

use tokio::sync::broadcast;

/// Events buffered per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Something observable changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A page id was pushed onto the history.
    Navigated { page_id: String },
    /// The pushed page was an ending.
    EndingReached { page_id: String },
    ItemsChanged,
    ActionLocked { page_id: String, action: String },
    ActionUnlocked { page_id: String, action: String },
    DialogOpened { title: String },
    DialogClosed,
    CheckpointsAllowedChanged { allow: bool },
    CheckpointSaved,
    CheckpointLoaded,
    /// Live state replaced from an imported save file.
    SaveImported,
    Restarted,
}

/// Broadcast sender shared by one state instance.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StateEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: StateEvent) {
        // Err only means nobody is listening.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
