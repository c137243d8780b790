use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display};

/// TMDb genre identifier
pub type GenreId = u32;

/// Catalogue identifier for a TV show (TMDb id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Normalizes a language code to its lower-case primary subtag
///
/// `"en-US"`, `"EN_gb"` and `" en "` all become `"en"`. Blank input yields `None`.
pub fn normalize_language(code: &str) -> Option<String> {
    let primary = code.trim().split(['-', '_']).next().unwrap_or_default();
    if primary.is_empty() {
        None
    } else {
        Some(primary.to_lowercase())
    }
}

/// Descriptive metadata for a catalogue item
///
/// Every field is optional: providers return whatever they know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre_ids: BTreeSet<GenreId>,
    /// Normalized original language (see [`normalize_language`])
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl ItemMetadata {
    /// Title for display, falling back to the numeric id
    pub fn display_title(meta: Option<&ItemMetadata>, id: ItemId) -> String {
        meta.and_then(|m| m.title.clone())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("#{}", id))
    }
}

/// Undirected, weighted co-mention edge between two items
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SocialEdge {
    pub item_a: ItemId,
    pub item_b: ItemId,
    pub weight: f64,
}

impl SocialEdge {
    /// Returns the endpoint opposite to `id`, if `id` is an endpoint
    pub fn other(&self, id: ItemId) -> Option<ItemId> {
        if self.item_a == id {
            Some(self.item_b)
        } else if self.item_b == id {
            Some(self.item_a)
        } else {
            None
        }
    }
}

/// Entry of the global trending feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub id: ItemId,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genre_ids: BTreeSet<GenreId>,
    #[serde(default)]
    pub popularity: f64,
}

/// Time window of the trending feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingWindow {
    Day,
    Week,
}

impl Display for TrendingWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendingWindow::Day => write!(f, "day"),
            TrendingWindow::Week => write!(f, "week"),
        }
    }
}
