//! Candidate generators
//!
//! Each generator returns `SourceResult`; the engine runs them concurrently
//! under a per-source timeout and turns any failure into an empty
//! contribution via [`absorb`].

use std::{future::Future, time::Duration};

use crate::error::{SourceError, SourceResult};

pub mod similarity;
pub mod social;
pub mod trending;

pub use similarity::SimilarityGenerator;
pub use social::{SocialAffinity, SocialGraphGenerator, SocialOutput};
pub use trending::TrendingGenerator;

/// Runs a generator future, failing with `SourceError::Timeout` once `limit` elapses
pub async fn with_timeout<T, F>(source: &'static str, limit: Duration, fut: F) -> SourceResult<T>
where
    F: Future<Output = SourceResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(source)),
    }
}

/// Degrades a failed source to its default (empty) contribution
pub fn absorb<T: Default>(source: &'static str, result: SourceResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(source, error = %e, "Candidate source failed, continuing without it");
            T::default()
        }
    }
}
