//! Testing utilities for stories.
//!
//! This module provides tools for integration testing:
//! - `sample_content` / `sample_state`, a small story exercising every hook
//! - `TestHarness` for scripted playthroughs
//! - Assertion helpers for verifying story state

use crate::content::{Page, PageAction, PageLink, StoryContent};
use crate::items::Item;
use crate::rules::{Condition, Effect};
use crate::state::{ActionOutcome, StoryState};
use std::sync::Arc;

/// A five-location story with one of everything.
///
/// ```text
/// main_menu -> forest -> cave -> lit_cave -> throne (ending)
///                  \-> river -> drowned (ending)
/// ```
pub fn sample_content() -> StoryContent {
    let items = vec![
        Item::new("torch", "Torch").with_description("Pitch-soaked rags on a stick."),
        Item::new("key", "Rusty Key"),
        Item::new("coin", "Gold Coin"),
    ];

    let pages = vec![
        Page::new("main_menu")
            .with_title("The Hollow Wood")
            .with_link(PageLink::new("forest").with_text("Begin")),
        Page::new("forest")
            .with_title("Forest")
            .with_text("Pines crowd the path.")
            .with_action(PageAction::simple(
                "Search the undergrowth",
                "Beneath the ferns you find a [torch].",
            ))
            .with_link(PageLink::new("cave").with_text("Enter the cave"))
            .with_link(
                PageLink::new("river")
                    .with_text("Follow the river")
                    .with_on_link(vec![Effect::SaveCheckpoint]),
            ),
        Page::new("river")
            .with_title("River")
            .with_action(PageAction::simple(
                "Wade in",
                "Something glints in the silt: a [key].",
            ))
            .with_link(PageLink::new("forest").with_text("Back to the forest"))
            .with_link(PageLink::new("drowned").with_text("Swim across")),
        Page::new("drowned")
            .with_title("Swept Away")
            .ending()
            .with_link(
                PageLink::new("main_menu")
                    .with_text("Try again")
                    .with_on_link(vec![Effect::LoadCheckpoint]),
            ),
        Page::new("cave")
            .with_title("Cave")
            .with_action(PageAction::scripted(
                "Open the chest",
                vec![
                    Effect::require(
                        Condition::has_item("key"),
                        vec![Effect::dialog("Locked", "The chest needs a [key].")],
                    ),
                    Effect::remove_item("key", 1),
                    Effect::add_item("coin", 3),
                    Effect::dialog("Opened", "Inside are three [coin]s."),
                ],
            ))
            .with_action(
                PageAction::scripted("Light the torch", vec![Effect::go_to("lit_cave")])
                    .with_condition(Condition::has_item("torch")),
            )
            .with_link(PageLink::new("forest").with_text("Leave")),
        Page::new("lit_cave")
            .with_title("Lit Cave")
            .with_link(
                PageLink::new("throne")
                    .with_text("Climb the stair")
                    .with_on_link(vec![Effect::require(
                        Condition::HasItem {
                            item: "coin".to_string(),
                            count: 3,
                        },
                        vec![Effect::dialog("Toll", "The stair demands three [coin]s.")],
                    )]),
            ),
        Page::new("throne").with_title("The Throne").ending(),
    ];

    StoryContent::new(pages, items).expect("sample story is valid")
}

/// A fresh in-memory state over [`sample_content`].
pub fn sample_state() -> StoryState {
    StoryState::in_memory(Arc::new(sample_content()))
}

/// Test harness for playing through a story.
pub struct TestHarness {
    /// The state under test.
    pub state: StoryState,
}

impl TestHarness {
    /// Create a harness over the sample story.
    pub fn new() -> Self {
        Self {
            state: sample_state(),
        }
    }

    /// Create a harness over custom content.
    pub fn with_content(content: StoryContent) -> Self {
        Self {
            state: StoryState::in_memory(Arc::new(content)),
        }
    }

    /// Wrap an existing state.
    pub fn with_state(state: StoryState) -> Self {
        Self { state }
    }

    /// Follow the current page's link to `page_id`. Returns whether the
    /// player moved.
    pub fn follow(&mut self, page_id: &str) -> bool {
        self.state.take_link_to(page_id)
    }

    /// Take an available action by name on the current page.
    pub fn act(&mut self, name: &str) -> Option<ActionOutcome> {
        self.state.take_action_named(name)
    }

    /// Close the dialog, running its callback.
    pub fn dismiss(&mut self) -> &mut Self {
        self.state.close_dialog();
        self
    }

    /// Id of the current page.
    pub fn page_id(&mut self) -> String {
        self.state.current_page().id.clone()
    }

    /// Names of the actions currently available.
    pub fn available(&mut self) -> Vec<String> {
        self.state
            .available_actions()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    /// Title of the open dialog, if one is showing.
    pub fn dialog_title(&self) -> Option<&str> {
        let dialog = self.state.dialog();
        dialog.show.then_some(dialog.title.as_str())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the player is on `page_id`.
#[track_caller]
pub fn assert_on_page(harness: &mut TestHarness, page_id: &str) {
    let actual = harness.page_id();
    assert_eq!(actual, page_id, "Expected to be on '{page_id}', was on '{actual}'");
}

/// Assert the player holds exactly `count` copies of `item`.
#[track_caller]
pub fn assert_item_count(harness: &TestHarness, item: &str, count: usize) {
    let actual = harness.state.item_count(item);
    assert_eq!(
        actual, count,
        "Expected {count} x '{item}' in inventory, found {actual}"
    );
}

/// Assert an action is currently offered.
#[track_caller]
pub fn assert_action_available(harness: &mut TestHarness, name: &str) {
    let available = harness.available();
    assert!(
        available.iter().any(|a| a == name),
        "Expected action '{name}' to be available, got {available:?}"
    );
}

/// Assert an action is NOT currently offered.
#[track_caller]
pub fn assert_action_unavailable(harness: &mut TestHarness, name: &str) {
    let available = harness.available();
    assert!(
        !available.iter().any(|a| a == name),
        "Expected action '{name}' to NOT be available, got {available:?}"
    );
}
