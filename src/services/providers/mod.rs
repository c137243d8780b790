//! Collaborator abstractions consumed by the recommendation core
//!
//! Each external system the engine reads from sits behind a narrow async trait
//! so the pipeline can be driven by Postgres/TMDb in production and by mocks or
//! in-memory fakes in tests. Every method reports failures as `SourceError`;
//! the caller decides whether a failure is fatal.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::SourceResult,
    models::{ItemId, ItemMetadata, SocialEdge, TrendingItem, TrendingWindow, UserId},
};

pub mod postgres;
pub mod tmdb;

pub use postgres::{PgLibraryStore, PgSocialSignalStore};
pub use tmdb::TmdbProvider;

/// Read access to a user's favorites, ratings and hidden items
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserLibraryStore: Send + Sync {
    async fn favorites(&self, user_id: UserId) -> SourceResult<BTreeSet<ItemId>>;

    /// Ratings on a 0-10 scale
    async fn ratings(&self, user_id: UserId) -> SourceResult<BTreeMap<ItemId, f64>>;

    async fn hidden(&self, user_id: UserId) -> SourceResult<BTreeSet<ItemId>>;
}

/// Read-only view of the co-mention graph built by offline ingestion
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SocialSignalStore: Send + Sync {
    /// Every edge with at least one endpoint in `item_ids`
    async fn edges_for(&self, item_ids: &BTreeSet<ItemId>) -> SourceResult<Vec<SocialEdge>>;

    /// Items with the highest aggregate co-mention score, best first
    async fn popular(&self, limit: usize) -> SourceResult<Vec<(ItemId, f64)>>;
}

/// External "more like this" capability
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SimilarityService: Send + Sync {
    async fn similar_items(&self, id: ItemId, max_results: usize) -> SourceResult<Vec<ItemId>>;
}

/// Global trending feed
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrendingFeed: Send + Sync {
    async fn trending(&self, window: TrendingWindow) -> SourceResult<Vec<TrendingItem>>;
}

/// Per-item descriptive metadata
///
/// Bulk fetching with bounded concurrency is layered on top by
/// [`crate::services::enrichment::DetailEnricher`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn details(&self, id: ItemId) -> SourceResult<ItemMetadata>;
}
