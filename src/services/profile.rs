use std::{collections::BTreeSet, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    models::{ItemId, LibrarySnapshot, TasteProfile, UserId},
    services::{enrichment::DetailEnricher, providers::UserLibraryStore},
};

/// Reads a user's library and derives the per-request taste profile
#[derive(Clone)]
pub struct TasteProfileBuilder {
    library: Arc<dyn UserLibraryStore>,
    liked_rating_threshold: f64,
}

impl TasteProfileBuilder {
    pub fn new(library: Arc<dyn UserLibraryStore>, liked_rating_threshold: f64) -> Self {
        Self {
            library,
            liked_rating_threshold,
        }
    }

    pub fn liked_rating_threshold(&self) -> f64 {
        self.liked_rating_threshold
    }

    /// Reads favorites, ratings and hidden items concurrently
    ///
    /// This is the only read whose failure aborts a request.
    pub async fn load_snapshot(&self, user_id: UserId) -> AppResult<LibrarySnapshot> {
        let (favorites, ratings, hidden) = tokio::try_join!(
            self.library.favorites(user_id),
            self.library.ratings(user_id),
            self.library.hidden(user_id),
        )
        .map_err(|e| {
            tracing::error!(user_id, source = "library", error = %e, "Failed to read user library");
            AppError::ProfileStore(e)
        })?;

        Ok(LibrarySnapshot {
            favorites,
            ratings,
            hidden,
        })
    }

    pub fn seed_ids(&self, snapshot: &LibrarySnapshot) -> BTreeSet<ItemId> {
        snapshot.seed_ids(self.liked_rating_threshold)
    }

    /// Builds the profile from seed metadata; seeds without metadata still count
    pub async fn build(&self, seed_ids: BTreeSet<ItemId>, enricher: &DetailEnricher) -> TasteProfile {
        let metadata = enricher.fetch_bulk(&seed_ids).await;

        let profile = TasteProfile::new(seed_ids, metadata);

        tracing::debug!(
            seeds = profile.seed_ids().len(),
            genres = profile.genre_weights().len(),
            languages = profile.allowed_languages().len(),
            "Taste profile built"
        );

        profile
    }
}
