//! StoryState - navigation, inventory and dialog state for one playthrough.
//!
//! The state owns its storage and writes the live record through after every
//! mutation, so a host can drop the process at any point and resume later.
//! Reads are plain accessors; observers that need to re-render subscribe to
//! [`StateEvent`]s instead of polling.

use crate::checkpoint::{CheckpointLoad, CheckpointSlot};
use crate::content::{Page, PageAction, PageLink, StoryContent};
use crate::debug::DebugView;
use crate::endings::EndingsTracker;
use crate::events::{EventBus, StateEvent};
use crate::interpolate::{interpolate_item_names, TextMode};
use crate::items::Item;
use crate::persist::{PersistError, SavedGame, StoredState, STATE_VERSION};
use crate::rules::{run_script, Effect};
use crate::storage::Storage;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default storage key of the live record.
pub const DEFAULT_STATE_KEY: &str = "cyoa-app";

/// Default storage key of the checkpoint slot.
pub const DEFAULT_CHECKPOINT_KEY: &str = "cyoa-app-checkpoint";

/// Configuration for a story state.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    /// Storage key of the live record.
    pub state_key: String,

    /// Storage key of the checkpoint slot.
    pub checkpoint_key: String,

    /// Rendering of item names in dialog text.
    pub text_mode: TextMode,
}

impl StoryConfig {
    pub fn new() -> Self {
        Self {
            state_key: DEFAULT_STATE_KEY.to_string(),
            checkpoint_key: DEFAULT_CHECKPOINT_KEY.to_string(),
            text_mode: TextMode::Markup,
        }
    }

    /// Set the live record key, e.g. to keep several stories in one store.
    pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = key.into();
        self
    }

    pub fn with_checkpoint_key(mut self, key: impl Into<String>) -> Self {
        self.checkpoint_key = key.into();
        self
    }

    pub fn with_text_mode(mut self, mode: TextMode) -> Self {
        self.text_mode = mode;
        self
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The modal dialog shown after simple actions. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogState {
    pub show: bool,
    pub title: String,
    pub description: String,
    /// Script run when the dialog is closed.
    pub callback: Option<Vec<Effect>>,
}

/// What [`StoryState::take_action`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action's condition failed; nothing happened.
    Blocked,
    /// The action ran and can no longer be taken on this page.
    Locked,
    /// The action ran but its script halted, so it stays available.
    LeftOpen,
}

/// Live state of one playthrough.
pub struct StoryState {
    config: StoryConfig,
    content: Arc<StoryContent>,
    storage: Box<dyn Storage>,
    endings: Box<dyn EndingsTracker>,
    checkpoint: CheckpointSlot,
    stored: StoredState,
    dialog: DialogState,
    events: EventBus,
}

impl StoryState {
    /// Open the state stored under `config.state_key`, or start fresh.
    ///
    /// A missing record starts on the root page. An unreadable or corrupt
    /// record is logged and replaced by a fresh one.
    pub fn open(
        config: StoryConfig,
        content: Arc<StoryContent>,
        storage: Box<dyn Storage>,
        endings: Box<dyn EndingsTracker>,
    ) -> Self {
        let fresh = StoredState::new(content.root_id());
        let stored = match storage.get(&config.state_key) {
            Ok(Some(raw)) => StoredState::decode(&raw).unwrap_or_else(|e| {
                log::warn!(
                    "Discarding unreadable state '{}': {e}",
                    config.state_key
                );
                fresh
            }),
            Ok(None) => fresh,
            Err(e) => {
                log::warn!("Could not read state '{}': {e}", config.state_key);
                fresh
            }
        };

        let checkpoint = CheckpointSlot::new(config.checkpoint_key.clone());
        let mut state = Self {
            config,
            content,
            storage,
            endings,
            checkpoint,
            stored,
            dialog: DialogState::default(),
            events: EventBus::new(),
        };
        state.persist();
        state
    }

    /// Fresh state with default config and in-memory collaborators.
    pub fn in_memory(content: Arc<StoryContent>) -> Self {
        Self::open(
            StoryConfig::default(),
            content,
            Box::new(crate::storage::MemoryStorage::new()),
            Box::new(crate::endings::AchievedEndings::new()),
        )
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn content(&self) -> Arc<StoryContent> {
        Arc::clone(&self.content)
    }

    pub fn endings(&self) -> &dyn EndingsTracker {
        self.endings.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }


    /// The page the player is on.
    ///
    /// Trailing history entries that no longer resolve are popped first. If
    /// that empties the history, the player is put back on the root page.
    pub fn current_page(&mut self) -> &Page {
        let id = self.repair_history();
        match self.content.page(&id) {
            Some(page) => page,
            None => self.content.root_page(),
        }
    }

    fn repair_history(&mut self) -> String {
        let mut dropped = 0;
        while let Some(id) = self.stored.history.last() {
            if self.content.page(id).is_some() {
                break;
            }
            log::debug!("Dropping unknown page '{id}' from history");
            self.stored.history.pop();
            dropped += 1;
        }

        if self.stored.history.is_empty() {
            self.stored.history.push(self.content.root_id().to_string());
            dropped += 1;
        }

        if dropped > 0 {
            self.persist();
        }

        self.stored
            .history
            .last()
            .cloned()
            .unwrap_or_else(|| self.content.root_id().to_string())
    }

    /// Push `page_id` onto the history.
    ///
    /// The id is not validated; unknown ids are dropped lazily by
    /// [`StoryState::current_page`]. Reaching an ending page notifies the
    /// endings tracker.
    pub fn go_to(&mut self, page_id: &str) {
        log::debug!("Navigating to '{page_id}'");
        self.stored.history.push(page_id.to_string());
        self.persist();
        self.events.emit(StateEvent::Navigated {
            page_id: page_id.to_string(),
        });

        let is_ending = self.content.page(page_id).is_some_and(|p| p.is_ending);
        if is_ending {
            self.endings.add_achieved_ending(page_id);
            self.events.emit(StateEvent::EndingReached {
                page_id: page_id.to_string(),
            });
        }
    }

    /// Follow a link unless its `on_link` script halts.
    ///
    /// Returns whether the player navigated.
    pub fn take_link(&mut self, link: &PageLink) -> bool {
        if let Some(script) = &link.on_link {
            if run_script(self, script).is_halt() {
                log::debug!("Link to '{}' cancelled by its script", link.link_to);
                return false;
            }
        }
        self.go_to(&link.link_to);
        true
    }

    /// Follow the current page's link to `page_id`, if it has one.
    pub fn take_link_to(&mut self, page_id: &str) -> bool {
        let content = self.content();
        let current = self.current_page().id.clone();
        let Some(link) = content.page(&current).and_then(|p| p.link_to(page_id)) else {
            log::debug!("Page '{current}' has no link to '{page_id}'");
            return false;
        };
        self.take_link(link)
    }

    pub fn history(&self) -> &[String] {
        &self.stored.history
    }

    pub fn visited(&self, page_id: &str) -> bool {
        self.stored.history.iter().any(|id| id == page_id)
    }


    /// Take `action` on `page`.
    ///
    /// A scripted action is locked unless its script halts. A simple action
    /// hands over every item its effect text mentions, shows that text in a
    /// dialog and is always locked.
    pub fn take_action(&mut self, page: &Page, action: &PageAction) -> ActionOutcome {
        if let Some(condition) = &action.condition {
            if !condition.holds(self) {
                return ActionOutcome::Blocked;
            }
        }

        let mut lock = true;
        if let Some(script) = &action.script {
            lock = !run_script(self, script).is_halt();
        } else if let Some(effect) = &action.effect {
            let content = self.content();
            let mode = self.config.text_mode;
            let interpolated = interpolate_item_names(effect, content.items(), mode);
            for item in &interpolated.items {
                self.add_item(item, 1);
            }
            let title = interpolate_item_names(&action.name, content.items(), mode).text;
            self.set_dialog(title, interpolated.text, None);
        }

        // A page that has run an action keeps a (possibly empty) lock list.
        if !self.stored.actions_taken.contains_key(&page.id) {
            self.stored.actions_taken.insert(page.id.clone(), Vec::new());
            self.persist();
        }

        if lock {
            self.lock_action(&page.id, &action.name);
            ActionOutcome::Locked
        } else {
            ActionOutcome::LeftOpen
        }
    }

    /// Take the available action called `name` on the current page.
    ///
    /// Returns `None` when no such action is available.
    pub fn take_action_named(&mut self, name: &str) -> Option<ActionOutcome> {
        let content = self.content();
        let current = self.current_page().id.clone();
        let page = content.page(&current)?;
        let action = page.action(name)?;
        if self.is_action_taken(&page.id, &action.name) {
            return None;
        }
        Some(self.take_action(page, action))
    }

    /// Actions on the current page that are not locked and whose condition
    /// holds. Recomputed on every call.
    pub fn available_actions(&mut self) -> Vec<&PageAction> {
        let id = self.repair_history();
        let state: &StoryState = self;
        let Some(page) = state.content.page(&id) else {
            return Vec::new();
        };
        page.actions
            .iter()
            .filter(|action| {
                !state.is_action_taken(&page.id, &action.name)
                    && action.condition.as_ref().map_or(true, |c| c.holds(state))
            })
            .collect()
    }

    /// Names of the actions locked on `page_id`, in lock order.
    pub fn actions_taken(&self, page_id: &str) -> &[String] {
        self.stored
            .actions_taken
            .get(page_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_action_taken(&self, page_id: &str, action: &str) -> bool {
        self.actions_taken(page_id).iter().any(|a| a == action)
    }

    /// Lock an action. Locking twice is a no-op.
    fn lock_action(&mut self, page_id: &str, action: &str) {
        let taken = self
            .stored
            .actions_taken
            .entry(page_id.to_string())
            .or_default();
        if taken.iter().any(|a| a == action) {
            return;
        }
        taken.push(action.to_string());
        log::debug!("Locked action '{action}' on '{page_id}'");
        self.persist();
        self.events.emit(StateEvent::ActionLocked {
            page_id: page_id.to_string(),
            action: action.to_string(),
        });
    }

    /// Make a locked action available again, removing every lock entry for
    /// it. Returns whether anything was removed.
    pub fn unlock_action(&mut self, page_id: &str, action: &str) -> bool {
        let taken = self
            .stored
            .actions_taken
            .entry(page_id.to_string())
            .or_default();
        let before = taken.len();
        taken.retain(|a| a != action);
        let removed = taken.len() != before;

        self.persist();
        if removed {
            self.events.emit(StateEvent::ActionUnlocked {
                page_id: page_id.to_string(),
                action: action.to_string(),
            });
        }
        removed
    }


    /// Add `count` copies of an item. Accepts an id or an [`Item`].
    pub fn add_item(&mut self, item: impl AsRef<str>, count: u32) {
        if count == 0 {
            return;
        }
        let id = item.as_ref();
        self.stored
            .inventory
            .extend(std::iter::repeat(id.to_string()).take(count as usize));
        self.persist();
        self.events.emit(StateEvent::ItemsChanged);
    }

    /// Remove up to `count` copies of an item, earliest first.
    ///
    /// Returns how many were actually removed.
    pub fn remove_item(&mut self, item: impl AsRef<str>, count: u32) -> u32 {
        let id = item.as_ref();
        let mut removed = 0;
        while removed < count {
            let Some(idx) = self.stored.inventory.iter().position(|i| i == id) else {
                break;
            };
            self.stored.inventory.remove(idx);
            removed += 1;
        }

        if removed > 0 {
            self.persist();
            self.events.emit(StateEvent::ItemsChanged);
        }
        removed
    }

    /// Inventory resolved through the item catalog, in pickup order.
    ///
    /// Ids missing from the catalog are skipped.
    pub fn inventory(&self) -> Vec<&Item> {
        self.stored
            .inventory
            .iter()
            .filter_map(|id| {
                let item = self.content.items().get(id);
                if item.is_none() {
                    log::warn!("Inventory holds unknown item '{id}'");
                }
                item
            })
            .collect()
    }

    pub fn inventory_ids(&self) -> &[String] {
        &self.stored.inventory
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.stored.inventory.iter().any(|i| i == id)
    }

    pub fn item_count(&self, id: &str) -> usize {
        self.stored.inventory.iter().filter(|i| *i == id).count()
    }


    /// Show a dialog. Item tokens in both strings are interpolated.
    ///
    /// Replaces any dialog already showing, callback included.
    pub fn open_dialog(&mut self, title: &str, description: &str, callback: Option<Vec<Effect>>) {
        let content = self.content();
        let mode = self.config.text_mode;
        let title = interpolate_item_names(title, content.items(), mode).text;
        let description = interpolate_item_names(description, content.items(), mode).text;
        self.set_dialog(title, description, callback);
    }

    fn set_dialog(&mut self, title: String, description: String, callback: Option<Vec<Effect>>) {
        self.events.emit(StateEvent::DialogOpened {
            title: title.clone(),
        });
        self.dialog = DialogState {
            show: true,
            title,
            description,
            callback,
        };
    }

    /// Hide the dialog and run its callback, if any.
    pub fn close_dialog(&mut self) {
        if !self.dialog.show {
            return;
        }
        self.dialog.show = false;
        let callback = self.dialog.callback.take();
        self.events.emit(StateEvent::DialogClosed);

        if let Some(script) = callback {
            run_script(self, &script);
        }
    }

    pub fn dialog(&self) -> &DialogState {
        &self.dialog
    }


    pub fn allow_checkpoints(&self) -> bool {
        self.stored.allow_checkpoints
    }

    pub fn set_allow_checkpoints(&mut self, allow: bool) {
        self.stored.allow_checkpoints = allow;
        self.persist();
        self.events.emit(StateEvent::CheckpointsAllowedChanged { allow });
    }

    /// Back to the root page with an empty inventory, no locked actions and
    /// no checkpoint.
    ///
    /// Always returns `false`: the player did not advance past the page
    /// they were navigating from.
    pub fn restart(&mut self) -> bool {
        log::info!("Restarting story");
        self.stored.history = vec![self.content.root_id().to_string()];
        self.stored.inventory.clear();
        self.stored.actions_taken.clear();
        self.persist();

        if let Err(e) = self.checkpoint.clear(self.storage.as_mut()) {
            log::warn!("Could not clear checkpoint: {e}");
        }

        self.events.emit(StateEvent::Restarted);
        false
    }


    /// Copy the live state into the checkpoint slot, replacing any earlier
    /// checkpoint. Dialog state is not included.
    pub fn save_checkpoint(&mut self) {
        match self.checkpoint.save(self.storage.as_mut(), &self.stored) {
            Ok(()) => {
                log::debug!("Checkpoint saved at '{}'", self.current_page_id());
                self.events.emit(StateEvent::CheckpointSaved);
            }
            Err(e) => log::warn!("Could not save checkpoint: {e}"),
        }
    }

    /// Replace the live state with the checkpoint.
    ///
    /// Live state is only touched when the checkpoint decodes completely.
    pub fn load_checkpoint(&mut self) -> CheckpointLoad {
        match self.checkpoint.read(self.storage.as_ref()) {
            Ok(Some(restored)) => {
                self.stored = restored;
                self.persist();
                self.events.emit(StateEvent::CheckpointLoaded);
                CheckpointLoad::Loaded
            }
            Ok(None) => CheckpointLoad::Missing,
            Err(e) => {
                log::error!("Error loading checkpoint: {e}");
                CheckpointLoad::Corrupt(e)
            }
        }
    }

    /// Decoded checkpoint for display, or `None` if absent or unreadable.
    pub fn checkpoint_info(&self) -> Option<StoredState> {
        self.checkpoint.read(self.storage.as_ref()).ok().flatten()
    }

    pub fn has_checkpoint(&self) -> bool {
        self.checkpoint.is_present(self.storage.as_ref())
    }


    /// Bundle the live state and checkpoint into an exportable save.
    pub fn export_save(&self) -> SavedGame {
        SavedGame::new(self.stored.clone(), self.checkpoint_info())
    }

    /// Replace the live state and checkpoint slot with an imported save.
    ///
    /// Nothing changes unless every record in the save can be written.
    pub fn import_save(&mut self, saved: SavedGame) -> Result<(), PersistError> {
        for state in std::iter::once(&saved.state).chain(saved.checkpoint.as_ref()) {
            if state.version != STATE_VERSION {
                return Err(PersistError::VersionMismatch {
                    expected: STATE_VERSION,
                    found: state.version,
                });
            }
        }

        // Checkpoint first: a failed slot write leaves the live state as it was.
        match &saved.checkpoint {
            Some(checkpoint) => self.checkpoint.save(self.storage.as_mut(), checkpoint)?,
            None => self.checkpoint.clear(self.storage.as_mut())?,
        }

        self.stored = saved.state;
        self.persist();
        self.events.emit(StateEvent::SaveImported);
        Ok(())
    }

    /// Write an export file.
    pub async fn export_to(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        self.export_save().save_json(path).await
    }

    /// Read an export file and import it.
    pub async fn import_from(&mut self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let saved = SavedGame::load_json(path).await?;
        self.import_save(saved)
    }


    pub fn debug(&mut self) -> DebugView<'_> {
        DebugView::new(self)
    }

    pub(crate) fn stored(&self) -> &StoredState {
        &self.stored
    }

    fn current_page_id(&self) -> &str {
        self.stored.current_page_id().unwrap_or_default()
    }

    /// Write the live record through to storage.
    fn persist(&mut self) {
        let result = self
            .stored
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set(&self.config.state_key, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            log::warn!("Could not persist state '{}': {e}", self.config.state_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endings::AchievedEndings;
    use crate::rules::Condition;
    use crate::storage::{FileStorage, MemoryStorage, StorageError};
    use crate::testing::{sample_content, sample_state};
    use tempfile::TempDir;

    #[test]
    fn test_fresh_state_defaults() {
        let mut state = sample_state();

        assert_eq!(state.history(), ["main_menu"]);
        assert!(state.inventory().is_empty());
        assert!(state.allow_checkpoints());
        assert!(!state.has_checkpoint());
        assert!(!state.dialog().show);
        assert_eq!(state.current_page().id, "main_menu");
    }

    #[test]
    fn test_current_page_prunes_unknown_tail() {
        let mut state = sample_state();
        state.go_to("forest");
        state.go_to("nowhere");
        state.go_to("also_nowhere");

        assert_eq!(state.current_page().id, "forest");
        assert_eq!(state.history(), ["main_menu", "forest"]);
    }

    #[test]
    fn test_current_page_refills_empty_history() {
        let storage = MemoryStorage::new().with_value(
            DEFAULT_STATE_KEY,
            r#"{"history":["gone"],"actionsTaken":{},"inventory":[],"allowCheckpoints":true}"#,
        );
        let mut state = StoryState::open(
            StoryConfig::default(),
            Arc::new(sample_content()),
            Box::new(storage),
            Box::new(AchievedEndings::new()),
        );

        assert_eq!(state.current_page().id, "main_menu");
        assert_eq!(state.history(), ["main_menu"]);
    }

    #[test]
    fn test_go_to_ending_notifies_tracker() {
        let mut state = sample_state();
        let mut rx = state.subscribe();

        state.go_to("drowned");

        assert!(state.endings().has_achieved("drowned"));
        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::Navigated {
                page_id: "drowned".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::EndingReached {
                page_id: "drowned".to_string()
            }
        );
    }

    #[test]
    fn test_go_to_unknown_page_is_not_an_ending() {
        let mut state = sample_state();
        state.go_to("nowhere");
        assert!(state.endings().achieved().is_empty());
    }

    #[test]
    fn test_take_link_respects_on_link() {
        let mut state = sample_state();

        let blocked = PageLink::new("forest").with_on_link(vec![Effect::Halt]);
        assert!(!state.take_link(&blocked));
        assert_eq!(state.history(), ["main_menu"]);

        let allowed = PageLink::new("forest").with_on_link(vec![Effect::add_item("coin", 1)]);
        assert!(state.take_link(&allowed));
        assert_eq!(state.history(), ["main_menu", "forest"]);
        assert!(state.has_item("coin"));

        let plain = PageLink::new("cave");
        assert!(state.take_link(&plain));
        assert_eq!(state.history(), ["main_menu", "forest", "cave"]);
    }

    #[test]
    fn test_add_then_remove_keeps_order() {
        let mut state = sample_state();
        state.add_item("coin", 1);
        state.add_item("torch", 3);
        state.add_item("key", 1);

        assert_eq!(state.remove_item("torch", 2), 2);
        assert_eq!(state.inventory_ids(), ["coin", "torch", "key"]);
    }

    #[test]
    fn test_remove_more_than_held() {
        let mut state = sample_state();
        state.add_item("coin", 2);

        assert_eq!(state.remove_item("coin", 5), 2);
        assert_eq!(state.remove_item("coin", 1), 0);
        assert!(state.inventory_ids().is_empty());
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut state = sample_state();
        let mut rx = state.subscribe();
        state.add_item("coin", 0);

        assert!(state.inventory_ids().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_add_item_accepts_item() {
        let mut state = sample_state();
        let content = state.content();
        let torch = content.items().get("torch").unwrap();

        state.add_item(torch, 2);
        assert_eq!(state.item_count("torch"), 2);
        assert_eq!(state.inventory(), vec![torch, torch]);
    }

    #[test]
    fn test_inventory_skips_unknown_ids() {
        let mut state = sample_state();
        state.add_item("coin", 1);
        state.add_item("ghost_item", 1);

        let names: Vec<&str> = state.inventory().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Gold Coin"]);
        assert_eq!(state.inventory_ids().len(), 2);
    }

    #[test]
    fn test_simple_action_collects_items_and_locks() {
        let mut state = sample_state();
        state.go_to("forest");

        let outcome = state.take_action_named("Search the undergrowth");
        assert_eq!(outcome, Some(ActionOutcome::Locked));

        assert!(state.has_item("torch"));
        assert!(state.is_action_taken("forest", "Search the undergrowth"));
        assert!(state.dialog().show);
        assert_eq!(state.dialog().title, "Search the undergrowth");
        assert!(state.dialog().description.contains("Torch"));

        // Locked actions cannot be taken again.
        assert_eq!(state.take_action_named("Search the undergrowth"), None);
        assert_eq!(state.item_count("torch"), 1);
    }

    #[test]
    fn test_halting_script_leaves_action_open() {
        let mut state = sample_state();
        state.go_to("cave");

        let outcome = state.take_action_named("Open the chest");
        assert_eq!(outcome, Some(ActionOutcome::LeftOpen));
        assert!(!state.is_action_taken("cave", "Open the chest"));
        assert!(state
            .available_actions()
            .iter()
            .any(|a| a.name == "Open the chest"));

        state.add_item("key", 1);
        assert_eq!(
            state.take_action_named("Open the chest"),
            Some(ActionOutcome::Locked)
        );
        assert!(state.has_item("coin"));
        assert!(!state.has_item("key"));
    }

    #[test]
    fn test_action_without_effect_still_locks() {
        let mut state = sample_state();
        let page = Page::new("forest");
        let action = PageAction {
            name: "Listen".to_string(),
            condition: None,
            script: None,
            effect: None,
        };

        assert_eq!(state.take_action(&page, &action), ActionOutcome::Locked);
        assert!(state.is_action_taken("forest", "Listen"));
        assert!(state.inventory_ids().is_empty());
        assert!(!state.dialog().show);
    }

    #[test]
    fn test_simple_action_adds_one_copy_per_mention() {
        let mut state = sample_state();
        let page = Page::new("forest");
        let action = PageAction::simple("Dig", "A [coin], then another [coin].");

        assert_eq!(state.take_action(&page, &action), ActionOutcome::Locked);
        assert_eq!(state.item_count("coin"), 2);
        assert_eq!(
            state.dialog().description.matches("Gold Coin").count(),
            2
        );
    }

    #[test]
    fn test_halted_action_leaves_empty_lock_list() {
        let mut state = sample_state();
        state.go_to("cave");

        assert_eq!(
            state.take_action_named("Open the chest"),
            Some(ActionOutcome::LeftOpen)
        );
        let snapshot = state.debug().full_state();
        assert_eq!(snapshot.actions_taken.get("cave"), Some(&Vec::new()));
    }

    #[test]
    fn test_blocked_condition_is_noop() {
        let mut state = sample_state();
        let content = state.content();
        let page = content.page("cave").unwrap();
        let action = page.action("Light the torch").unwrap();

        assert_eq!(state.take_action(page, action), ActionOutcome::Blocked);
        assert!(state.actions_taken("cave").is_empty());
    }

    #[test]
    fn test_available_actions_filters() {
        let mut state = sample_state();
        state.go_to("cave");

        let names: Vec<String> = state
            .available_actions()
            .iter()
            .map(|a| a.name.clone())
            .collect();
        assert_eq!(names, vec!["Open the chest"]);

        state.add_item("torch", 1);
        let names: Vec<String> = state
            .available_actions()
            .iter()
            .map(|a| a.name.clone())
            .collect();
        assert_eq!(names, vec!["Open the chest", "Light the torch"]);
    }

    #[test]
    fn test_lock_has_set_semantics() {
        let mut state = sample_state();
        let page = Page::new("forest");
        let action = PageAction::scripted("Whistle", vec![]);

        state.take_action(&page, &action);
        state.take_action(&page, &action);
        assert_eq!(state.actions_taken("forest"), ["Whistle"]);
    }

    #[test]
    fn test_open_dialog_replaces_previous() {
        let mut state = sample_state();
        state.open_dialog("First", "one", Some(vec![Effect::add_item("coin", 1)]));
        state.open_dialog("A [key]", "two", None);

        assert!(state.dialog().title.contains("Rusty Key"));
        assert_eq!(state.dialog().description, "two");
        assert!(state.dialog().callback.is_none());

        state.close_dialog();
        assert!(!state.dialog().show);
        assert!(!state.has_item("coin"));
    }

    #[test]
    fn test_close_dialog_runs_callback_once() {
        let mut state = sample_state();
        state.open_dialog("Gift", "", Some(vec![Effect::add_item("coin", 1)]));

        state.close_dialog();
        state.close_dialog();
        assert_eq!(state.item_count("coin"), 1);
    }

    #[test]
    fn test_plain_text_mode() {
        let mut state = StoryState::open(
            StoryConfig::default().with_text_mode(TextMode::Plain),
            Arc::new(sample_content()),
            Box::new(MemoryStorage::new()),
            Box::new(AchievedEndings::new()),
        );
        state.open_dialog("Found", "A [torch]", None);
        assert_eq!(state.dialog().description, "A Torch");
    }

    #[test]
    fn test_set_allow_checkpoints_notifies() {
        let mut state = sample_state();
        let mut rx = state.subscribe();

        state.set_allow_checkpoints(false);
        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::CheckpointsAllowedChanged { allow: false }
        );

        run_script(&mut state, &[Effect::SetAllowCheckpoints { allow: true }]);
        assert!(state.allow_checkpoints());
        assert_eq!(
            rx.try_recv().unwrap(),
            StateEvent::CheckpointsAllowedChanged { allow: true }
        );
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut state = sample_state();
        state.go_to("forest");
        state.add_item("coin", 2);
        state.take_action_named("Search the undergrowth");
        state.set_allow_checkpoints(false);
        state.save_checkpoint();

        assert!(!state.restart());
        assert_eq!(state.history(), ["main_menu"]);
        assert!(state.inventory_ids().is_empty());
        assert!(state.stored().actions_taken.is_empty());
        assert!(!state.has_checkpoint());
        assert!(!state.allow_checkpoints());
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut state = sample_state();
        state.go_to("forest");
        state.add_item("coin", 1);
        state.take_action_named("Search the undergrowth");
        state.save_checkpoint();
        let saved = state.stored().clone();

        state.go_to("cave");
        state.remove_item("coin", 1);
        state.set_allow_checkpoints(false);
        state.open_dialog("Still here", "", None);

        assert!(state.load_checkpoint().is_loaded());
        assert_eq!(state.stored(), &saved);
        assert!(state.dialog().show);
        assert_eq!(state.dialog().title, "Still here");
    }

    #[test]
    fn test_load_missing_checkpoint() {
        let mut state = sample_state();
        state.go_to("forest");
        let before = state.stored().clone();

        let result = state.load_checkpoint();
        assert!(matches!(result, CheckpointLoad::Missing));
        assert!(result.needs_redirect());
        assert_eq!(state.stored(), &before);
    }

    #[test]
    fn test_load_corrupt_checkpoint() {
        let storage = MemoryStorage::new().with_value(DEFAULT_CHECKPOINT_KEY, "{\"history\":");
        let mut state = StoryState::open(
            StoryConfig::default(),
            Arc::new(sample_content()),
            Box::new(storage),
            Box::new(AchievedEndings::new()),
        );
        state.go_to("forest");
        let before = state.stored().clone();

        assert!(state.has_checkpoint());
        assert!(state.checkpoint_info().is_none());

        let result = state.load_checkpoint();
        assert!(matches!(result, CheckpointLoad::Corrupt(_)));
        assert!(result.needs_redirect());
        assert_eq!(state.stored(), &before);
    }

    #[test]
    fn test_checkpoint_info() {
        let mut state = sample_state();
        assert!(state.checkpoint_info().is_none());

        state.go_to("forest");
        state.save_checkpoint();
        state.go_to("cave");

        let info = state.checkpoint_info().unwrap();
        assert_eq!(info.current_page_id(), Some("forest"));
    }

    #[test]
    fn test_corrupt_live_record_resets() {
        let storage = MemoryStorage::new().with_value(DEFAULT_STATE_KEY, "garbage");
        let mut state = StoryState::open(
            StoryConfig::default(),
            Arc::new(sample_content()),
            Box::new(storage),
            Box::new(AchievedEndings::new()),
        );
        assert_eq!(state.current_page().id, "main_menu");
    }

    #[test]
    fn test_unlock_action_condition() {
        let mut state = sample_state();
        state.go_to("forest");
        state.take_action_named("Search the undergrowth");
        assert!(Condition::action_taken("forest", "Search the undergrowth").holds(&state));

        assert!(state.unlock_action("forest", "Search the undergrowth"));
        assert!(!state.unlock_action("forest", "Search the undergrowth"));
        assert!(!Condition::action_taken("forest", "Search the undergrowth").holds(&state));
    }

    #[test]
    fn test_import_rejects_foreign_state_version() {
        let mut state = sample_state();
        let mut saved = state.export_save();
        saved.state.version = 9;

        assert!(matches!(
            state.import_save(saved),
            Err(PersistError::VersionMismatch { found: 9, .. })
        ));
        assert_eq!(state.history(), ["main_menu"]);
    }

    #[test]
    fn test_import_replaces_state_and_checkpoint() {
        let mut source = sample_state();
        source.go_to("forest");
        source.save_checkpoint();
        source.add_item("coin", 1);
        let saved = source.export_save();

        let mut state = sample_state();
        state.import_save(saved).unwrap();

        assert_eq!(state.history(), ["main_menu", "forest"]);
        assert!(state.has_item("coin"));
        assert!(state.load_checkpoint().is_loaded());
        assert!(!state.has_item("coin"));
    }

    #[test]
    fn test_import_is_all_or_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::open(temp_dir.path()).expect("Storage should open");
        // Not a valid file name, so every checkpoint write fails.
        let mut state = StoryState::open(
            StoryConfig::default().with_checkpoint_key("bad key"),
            Arc::new(sample_content()),
            Box::new(storage),
            Box::new(AchievedEndings::new()),
        );
        state.go_to("forest");

        let mut source = sample_state();
        source.go_to("cave");
        source.save_checkpoint();
        source.add_item("coin", 1);

        let result = state.import_save(source.export_save());
        assert!(matches!(
            result,
            Err(PersistError::Storage(StorageError::InvalidKey(_)))
        ));
        assert_eq!(state.history(), ["main_menu", "forest"]);
        assert!(!state.has_item("coin"));
    }
}
