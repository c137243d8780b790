//! Global trending feed filtered down to the user's taste

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use crate::{
    error::SourceResult,
    models::{
        normalize_language, BlockSet, Candidate, GenreId, SourceTag, TasteProfile, TrendingItem,
        TrendingWindow,
    },
    services::providers::TrendingFeed,
};

const TRENDING_BASE_SCORE: f64 = 0.3;
const TRENDING_POPULARITY_SCALE: f64 = 0.4;

/// Damped popularity score so trending nudges rather than drives the ranking
pub fn trending_score(popularity: f64) -> f64 {
    let popularity = if popularity.is_finite() { popularity.max(0.0) } else { 0.0 };
    TRENDING_BASE_SCORE + TRENDING_POPULARITY_SCALE * (1.0 + popularity).log10()
}

#[derive(Clone)]
pub struct TrendingGenerator {
    feed: Arc<dyn TrendingFeed>,
    window: TrendingWindow,
    denylist: BTreeSet<GenreId>,
}

impl TrendingGenerator {
    pub fn new(
        feed: Arc<dyn TrendingFeed>,
        window: TrendingWindow,
        denylist: impl IntoIterator<Item = GenreId>,
    ) -> Self {
        Self {
            feed,
            window,
            denylist: denylist.into_iter().collect(),
        }
    }

    pub async fn generate(&self, profile: &TasteProfile, block: &BlockSet) -> SourceResult<Vec<Candidate>> {
        let feed = self.feed.trending(self.window).await?;
        let fetched = feed.len();

        let mut seen = HashSet::new();
        let candidates: Vec<Candidate> = feed
            .into_iter()
            .filter(|item| !block.contains(&item.id) && !profile.is_seed(&item.id))
            .filter(|item| self.accepts(profile, item))
            .filter(|item| seen.insert(item.id))
            .map(|item| Candidate::new(item.id, SourceTag::Trending, trending_score(item.popularity)))
            .collect();

        tracing::debug!(
            window = %self.window,
            fetched,
            kept = candidates.len(),
            "Trending candidates generated"
        );

        Ok(candidates)
    }

    fn accepts(&self, profile: &TasteProfile, item: &TrendingItem) -> bool {
        let allowed = profile.allowed_languages();
        if !allowed.is_empty() {
            let language = item.language.as_deref().and_then(normalize_language);
            match language {
                Some(lang) if allowed.contains(&lang) => {}
                _ => return false,
            }
        }

        if item.genre_ids.iter().any(|g| self.denylist.contains(g)) {
            return false;
        }

        let weights = profile.genre_weights();
        weights.is_empty() || item.genre_ids.iter().any(|g| weights.contains_key(g))
    }
}
