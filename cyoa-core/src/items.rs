//! Item catalog.
//!
//! Items are referenced everywhere by their string id. The catalog maps ids
//! to the display data needed when rendering the inventory or interpolating
//! `[item_id]` tokens inside story text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A collectible item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier used in inventory and story text.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Flavor text shown when inspecting the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Items are addressed by id, so an `&Item` can stand in for its id anywhere
/// an `impl AsRef<str>` is accepted.
impl AsRef<str> for Item {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

/// Lookup table from item id to item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Item>", into = "Vec<Item>")]
pub struct ItemCatalog {
    items: HashMap<String, Item>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning the previous entry with the same id.
    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id.clone(), item)
    }

    /// Builder form of [`ItemCatalog::insert`].
    pub fn with_item(mut self, item: Item) -> Self {
        self.insert(item);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items, sorted by id for stable output.
    pub fn items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

impl From<Vec<Item>> for ItemCatalog {
    fn from(items: Vec<Item>) -> Self {
        items.into_iter().fold(Self::new(), Self::with_item)
    }
}

impl From<ItemCatalog> for Vec<Item> {
    fn from(catalog: ItemCatalog) -> Self {
        let mut items: Vec<Item> = catalog.items.into_values().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

impl FromIterator<Item> for ItemCatalog {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with_item)
    }
}
