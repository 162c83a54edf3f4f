//! Condition/Effect DSL for story content.
//!
//! Actions and links carry guards and side effects as data instead of code:
//! 1. A [`Condition`] is evaluated read-only against the [`StoryState`]
//! 2. A script (a list of [`Effect`]s) is applied in order
//! 3. The script's [`ScriptOutcome`] tells the caller whether to carry on
//!    (lock the action, follow the link) or stop
//!
//! Content stays serializable, and every hook is testable without a UI.

use crate::state::StoryState;
use serde::{Deserialize, Serialize};

fn one() -> u32 {
    1
}

/// A guard evaluated against the current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// At least `count` copies of `item` are in the inventory.
    HasItem {
        item: String,
        #[serde(default = "one")]
        count: u32,
    },

    /// No copy of `item` is in the inventory.
    LacksItem { item: String },

    /// `action` has been locked on `page`.
    ActionTaken { page: String, action: String },

    /// `page` appears anywhere in the history.
    Visited { page: String },

    CheckpointsAllowed,

    HasCheckpoint,

    All { conditions: Vec<Condition> },

    Any { conditions: Vec<Condition> },

    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn has_item(item: impl Into<String>) -> Self {
        Condition::HasItem {
            item: item.into(),
            count: 1,
        }
    }

    pub fn lacks_item(item: impl Into<String>) -> Self {
        Condition::LacksItem { item: item.into() }
    }

    pub fn action_taken(page: impl Into<String>, action: impl Into<String>) -> Self {
        Condition::ActionTaken {
            page: page.into(),
            action: action.into(),
        }
    }

    pub fn visited(page: impl Into<String>) -> Self {
        Condition::Visited { page: page.into() }
    }

    pub fn negate(self) -> Self {
        Condition::Not {
            condition: Box::new(self),
        }
    }

    /// Evaluate against `state`. Never mutates.
    pub fn holds(&self, state: &StoryState) -> bool {
        match self {
            Condition::HasItem { item, count } => state.item_count(item) >= *count as usize,
            Condition::LacksItem { item } => !state.has_item(item),
            Condition::ActionTaken { page, action } => state.is_action_taken(page, action),
            Condition::Visited { page } => state.visited(page),
            Condition::CheckpointsAllowed => state.allow_checkpoints(),
            Condition::HasCheckpoint => state.has_checkpoint(),
            Condition::All { conditions } => conditions.iter().all(|c| c.holds(state)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.holds(state)),
            Condition::Not { condition } => !condition.holds(state),
        }
    }
}

/// A single state change performed by an action or link script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    AddItem {
        item: String,
        #[serde(default = "one")]
        count: u32,
    },

    RemoveItem {
        item: String,
        #[serde(default = "one")]
        count: u32,
    },

    GoTo { page: String },

    OpenDialog {
        title: String,
        #[serde(default)]
        description: String,
        /// Runs when the dialog is closed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        callback: Option<Vec<Effect>>,
    },

    SetAllowCheckpoints { allow: bool },

    SaveCheckpoint,

    /// Halts when the checkpoint was restored, so a link carrying this does
    /// not navigate on top of the restored history.
    LoadCheckpoint,

    /// Always halts.
    Restart,

    UnlockAction { page: String, action: String },

    /// If `condition` fails, run `otherwise` and halt.
    Require {
        condition: Condition,
        #[serde(default)]
        otherwise: Vec<Effect>,
    },

    /// Stop the script: the action stays available, the link is not taken.
    Halt,
}

impl Effect {
    pub fn add_item(item: impl Into<String>, count: u32) -> Self {
        Effect::AddItem {
            item: item.into(),
            count,
        }
    }

    pub fn remove_item(item: impl Into<String>, count: u32) -> Self {
        Effect::RemoveItem {
            item: item.into(),
            count,
        }
    }

    pub fn go_to(page: impl Into<String>) -> Self {
        Effect::GoTo { page: page.into() }
    }

    pub fn dialog(title: impl Into<String>, description: impl Into<String>) -> Self {
        Effect::OpenDialog {
            title: title.into(),
            description: description.into(),
            callback: None,
        }
    }

    pub fn require(condition: Condition, otherwise: Vec<Effect>) -> Self {
        Effect::Require {
            condition,
            otherwise,
        }
    }
}

/// What a script asks of its caller once it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Lock the action / follow the link.
    Continue,
    /// Leave the action available / cancel the link.
    Halt,
}

impl ScriptOutcome {
    pub fn is_halt(self) -> bool {
        self == ScriptOutcome::Halt
    }
}

/// Apply a script, stopping at the first effect that halts.
pub fn run_script(state: &mut StoryState, script: &[Effect]) -> ScriptOutcome {
    for effect in script {
        if apply_effect(state, effect).is_halt() {
            return ScriptOutcome::Halt;
        }
    }
    ScriptOutcome::Continue
}

/// Apply a single effect.
pub fn apply_effect(state: &mut StoryState, effect: &Effect) -> ScriptOutcome {
    match effect {
        Effect::AddItem { item, count } => {
            state.add_item(item, *count);
        }
        Effect::RemoveItem { item, count } => {
            state.remove_item(item, *count);
        }
        Effect::GoTo { page } => {
            state.go_to(page);
        }
        Effect::OpenDialog {
            title,
            description,
            callback,
        } => {
            state.open_dialog(title, description, callback.clone());
        }
        Effect::SetAllowCheckpoints { allow } => {
            state.set_allow_checkpoints(*allow);
        }
        Effect::SaveCheckpoint => {
            state.save_checkpoint();
        }
        Effect::LoadCheckpoint => {
            if !state.load_checkpoint().needs_redirect() {
                return ScriptOutcome::Halt;
            }
        }
        Effect::Restart => {
            state.restart();
            return ScriptOutcome::Halt;
        }
        Effect::UnlockAction { page, action } => {
            state.unlock_action(page, action);
        }
        Effect::Require {
            condition,
            otherwise,
        } => {
            if !condition.holds(state) {
                run_script(state, otherwise);
                return ScriptOutcome::Halt;
            }
        }
        Effect::Halt => return ScriptOutcome::Halt,
    }
    ScriptOutcome::Continue
}
