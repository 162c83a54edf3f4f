//! Story content: the page graph and the item catalog it references.
//!
//! Content is pure data. Guards and side effects attached to actions and
//! links are expressed with the [`Condition`]/[`Effect`] DSL from
//! [`crate::rules`], so a whole story can be loaded from JSON.

use crate::items::{Item, ItemCatalog};
use crate::rules::{Condition, Effect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Page every story starts on unless configured otherwise.
pub const DEFAULT_ROOT_PAGE: &str = "main_menu";

/// Errors from building or loading story content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Root page '{0}' is not defined")]
    MissingRoot(String),

    #[error("Page '{0}' is defined more than once")]
    DuplicatePage(String),

    #[error("Item '{0}' is defined more than once")]
    DuplicateItem(String),
}

/// A node in the story graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Body text, may contain `[item_id]` tokens.
    #[serde(default)]
    pub text: String,

    /// Reaching this page records an achieved ending.
    #[serde(default)]
    pub is_ending: bool,

    #[serde(default)]
    pub actions: Vec<PageAction>,

    #[serde(default)]
    pub links: Vec<PageLink>,
}

impl Page {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            text: String::new(),
            is_ending: false,
            actions: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn ending(mut self) -> Self {
        self.is_ending = true;
        self
    }

    pub fn with_action(mut self, action: PageAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_link(mut self, link: PageLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn action(&self, name: &str) -> Option<&PageAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn link_to(&self, page_id: &str) -> Option<&PageLink> {
        self.links.iter().find(|l| l.link_to == page_id)
    }
}

/// A page-local interactable.
///
/// With a `script`, the script decides whether the action gets locked. Without
/// one, the action is "simple": its `effect` text is shown in a dialog and
/// every item it mentions goes into the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAction {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    #[serde(default, rename = "action", skip_serializing_if = "Option::is_none")]
    pub script: Option<Vec<Effect>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

impl PageAction {
    /// An action that only shows `effect` text and collects its items.
    pub fn simple(name: impl Into<String>, effect: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
            script: None,
            effect: Some(effect.into()),
        }
    }

    /// An action driven by a script.
    pub fn scripted(name: impl Into<String>, script: Vec<Effect>) -> Self {
        Self {
            name: name.into(),
            condition: None,
            script: Some(script),
            effect: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// A directed edge to another page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLink {
    pub link_to: String,

    #[serde(default)]
    pub text: String,

    /// Runs before navigating; a halting script cancels the navigation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_link: Option<Vec<Effect>>,
}

impl PageLink {
    pub fn new(link_to: impl Into<String>) -> Self {
        Self {
            link_to: link_to.into(),
            text: String::new(),
            on_link: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_on_link(mut self, script: Vec<Effect>) -> Self {
        self.on_link = Some(script);
        self
    }
}

/// On-disk shape of a story.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentFile {
    #[serde(default)]
    root: Option<String>,
    pages: Vec<Page>,
    #[serde(default)]
    items: Vec<Item>,
}

/// A validated story: page graph plus item catalog.
///
/// Construction guarantees the root page exists, which is what lets history
/// repair always terminate on a real page.
#[derive(Debug, Clone)]
pub struct StoryContent {
    root: String,
    pages: HashMap<String, Page>,
    items: ItemCatalog,
}

impl StoryContent {
    /// Build content rooted at [`DEFAULT_ROOT_PAGE`].
    pub fn new(pages: Vec<Page>, items: Vec<Item>) -> Result<Self, ContentError> {
        Self::with_root(DEFAULT_ROOT_PAGE, pages, items)
    }

    pub fn with_root(
        root: impl Into<String>,
        pages: Vec<Page>,
        items: Vec<Item>,
    ) -> Result<Self, ContentError> {
        let root = root.into();

        let mut page_map = HashMap::with_capacity(pages.len());
        for page in pages {
            if page_map.contains_key(&page.id) {
                return Err(ContentError::DuplicatePage(page.id));
            }
            page_map.insert(page.id.clone(), page);
        }

        let mut catalog = ItemCatalog::new();
        for item in items {
            if catalog.contains(&item.id) {
                return Err(ContentError::DuplicateItem(item.id));
            }
            catalog.insert(item);
        }

        if !page_map.contains_key(&root) {
            return Err(ContentError::MissingRoot(root));
        }

        Ok(Self {
            root,
            pages: page_map,
            items: catalog,
        })
    }

    /// Parse content from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let file: ContentFile = serde_json::from_str(json)?;
        let root = file.root.unwrap_or_else(|| DEFAULT_ROOT_PAGE.to_string());
        Self::with_root(root, file.pages, file.items)
    }

    /// Load content from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let content = fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Serialize content back to pretty JSON.
    pub fn to_json(&self) -> Result<String, ContentError> {
        let mut pages: Vec<Page> = self.pages.values().cloned().collect();
        pages.sort_by(|a, b| a.id.cmp(&b.id));
        let file = ContentFile {
            root: Some(self.root.clone()),
            pages,
            items: self.items.clone().into(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn root_id(&self) -> &str {
        &self.root
    }

    pub fn root_page(&self) -> &Page {
        &self.pages[&self.root]
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn items(&self) -> &ItemCatalog {
        &self.items
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Ids of every page flagged as an ending, sorted.
    pub fn ending_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .pages
            .values()
            .filter(|p| p.is_ending)
            .map(|p| p.id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}
