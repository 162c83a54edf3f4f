//! State engine for choose-your-own-adventure stories.
//!
//! This crate provides:
//! - A page graph with guarded links and one-shot actions, loadable from JSON
//! - A Condition/Effect DSL so content hooks stay plain data
//! - Navigation history, inventory and dialog state with write-through storage
//! - A single save/restore checkpoint slot and exportable save files
//!
//! # Quick Start
//!
//! ```ignore
//! use cyoa_core::{FileStorage, AchievedEndings, StoryConfig, StoryContent, StoryState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let content = Arc::new(StoryContent::load_json("story.json").await?);
//!     let storage = FileStorage::open("saves")?;
//!
//!     let mut state = StoryState::open(
//!         StoryConfig::default(),
//!         content,
//!         Box::new(storage),
//!         Box::new(AchievedEndings::new()),
//!     );
//!
//!     println!("{}", state.current_page().title);
//!     state.take_link_to("forest");
//!     state.take_action_named("Search the undergrowth");
//!
//!     state.save_checkpoint();
//!     state.export_to("my_run.json").await?;
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod content;
pub mod debug;
pub mod endings;
pub mod events;
pub mod interpolate;
pub mod items;
pub mod persist;
pub mod rules;
pub mod state;
pub mod storage;
pub mod testing;

// Primary public API
pub use checkpoint::{CheckpointError, CheckpointLoad};
pub use content::{ContentError, Page, PageAction, PageLink, StoryContent};
pub use endings::{AchievedEndings, EndingsTracker};
pub use events::StateEvent;
pub use interpolate::{interpolate_item_names, Interpolated, TextMode};
pub use items::{Item, ItemCatalog};
pub use persist::{PersistError, SavedGame, StoredState};
pub use rules::{Condition, Effect, ScriptOutcome};
pub use state::{ActionOutcome, DialogState, StoryConfig, StoryState};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use testing::TestHarness;
