//! Item-name interpolation for story text.
//!
//! Story text refers to items with `[item_id]` tokens. Interpolation swaps
//! each known token for the item's display name and reports which items were
//! mentioned, so simple actions can hand them to the player.

use crate::items::{Item, ItemCatalog};
use regex::{Captures, Regex};

lazy_static::lazy_static! {
    /// A `[`, then anything up to the next `]` that is not itself a bracket.
    static ref ITEM_TOKEN: Regex =
        Regex::new(r"\[([^\[\]]*)\]").expect("item token pattern is valid");
}

/// How replaced item names are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Bare display name.
    Plain,
    /// Display name wrapped in a styling span.
    #[default]
    Markup,
}

/// Result of interpolating a string.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated<'a> {
    pub text: String,
    /// One entry per replaced token, in order of appearance.
    pub items: Vec<&'a Item>,
}

/// Replace `[item_id]` tokens with item names.
///
/// Unknown ids are left verbatim and are not reported.
pub fn interpolate_item_names<'a>(
    text: &str,
    catalog: &'a ItemCatalog,
    mode: TextMode,
) -> Interpolated<'a> {
    let mut items = Vec::new();

    let text = ITEM_TOKEN
        .replace_all(text, |caps: &Captures<'_>| {
            let Some(item) = catalog.get(&caps[1]) else {
                return caps[0].to_string();
            };
            items.push(item);
            render_name(item, mode)
        })
        .into_owned();

    Interpolated { text, items }
}

fn render_name(item: &Item, mode: TextMode) -> String {
    match mode {
        TextMode::Plain => item.name.clone(),
        TextMode::Markup => format!(
            r#"<span class="underline italic text-gray-200">{}</span>"#,
            item.name
        ),
    }
}
