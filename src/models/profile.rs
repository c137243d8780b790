use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use super::{GenreId, ItemId, ItemMetadata};

/// Primary key of a user account
pub type UserId = i64;

/// Point-in-time read of a user's library
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibrarySnapshot {
    pub favorites: BTreeSet<ItemId>,
    pub ratings: BTreeMap<ItemId, f64>,
    pub hidden: BTreeSet<ItemId>,
}

impl LibrarySnapshot {
    /// Favorites plus every item rated at or above `liked_threshold`
    pub fn seed_ids(&self, liked_threshold: f64) -> BTreeSet<ItemId> {
        let liked = self
            .ratings
            .iter()
            .filter(|(_, rating)| **rating >= liked_threshold)
            .map(|(id, _)| *id);

        self.favorites.iter().copied().chain(liked).collect()
    }

    /// Items that must never be recommended: favorites and hidden items
    pub fn block_set(&self) -> BlockSet {
        BlockSet(self.favorites.union(&self.hidden).copied().collect())
    }

    /// Stable digest of everything that influences a recommendation
    ///
    /// Two snapshots with different seeds or block sets never share a fingerprint
    /// modulo hash collisions.
    pub fn fingerprint(&self, liked_threshold: f64) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed_ids(liked_threshold).hash(&mut hasher);
        self.block_set().sorted().hash(&mut hasher);
        hasher.finish()
    }
}

/// Items excluded from every recommendation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet(std::collections::HashSet<ItemId>);

impl BlockSet {
    pub fn contains(&self, id: &ItemId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn sorted(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.0.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<ItemId> for BlockSet {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Derived summary of a user's taste, built fresh per request
#[derive(Debug, Clone, Default, Serialize)]
pub struct TasteProfile {
    seed_ids: BTreeSet<ItemId>,
    genre_weights: BTreeMap<GenreId, u32>,
    allowed_languages: BTreeSet<String>,
    #[serde(skip)]
    seed_metadata: HashMap<ItemId, ItemMetadata>,
}

impl TasteProfile {
    /// Builds a profile from seed ids and whatever metadata could be fetched for them
    ///
    /// Seeds without metadata still count as seeds but contribute no genres or
    /// languages.
    pub fn new(seed_ids: BTreeSet<ItemId>, mut seed_metadata: HashMap<ItemId, ItemMetadata>) -> Self {
        seed_metadata.retain(|id, _| seed_ids.contains(id));

        let mut genre_weights: BTreeMap<GenreId, u32> = BTreeMap::new();
        let mut allowed_languages = BTreeSet::new();

        for meta in seed_metadata.values() {
            for genre in &meta.genre_ids {
                *genre_weights.entry(*genre).or_default() += 1;
            }
            if let Some(lang) = &meta.language {
                allowed_languages.insert(lang.clone());
            }
        }

        Self {
            seed_ids,
            genre_weights,
            allowed_languages,
            seed_metadata,
        }
    }

    pub fn seed_ids(&self) -> &BTreeSet<ItemId> {
        &self.seed_ids
    }

    pub fn genre_weights(&self) -> &BTreeMap<GenreId, u32> {
        &self.genre_weights
    }

    /// Empty set means no language restriction
    pub fn allowed_languages(&self) -> &BTreeSet<String> {
        &self.allowed_languages
    }

    pub fn seed_metadata(&self, id: &ItemId) -> Option<&ItemMetadata> {
        self.seed_metadata.get(id)
    }

    /// Seeds with known metadata, in ascending id order
    pub fn seeds_with_metadata(&self) -> impl Iterator<Item = (ItemId, &ItemMetadata)> {
        self.seed_ids
            .iter()
            .filter_map(|id| self.seed_metadata.get(id).map(|meta| (*id, meta)))
    }

    pub fn is_seed(&self, id: &ItemId) -> bool {
        self.seed_ids.contains(id)
    }
}
