//! Bulk metadata fetching with bounded concurrency
//!
//! One task per unique id, gated by a semaphore so the metadata API sees at
//! most `concurrency` requests in flight; the rest queue on the semaphore.
//! A failed lookup only costs that item its metadata.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    error::{SourceError, SourceResult},
    models::{Candidate, ItemId, ItemMetadata},
    services::providers::MetadataProvider,
};

#[derive(Clone)]
pub struct DetailEnricher {
    provider: Arc<dyn MetadataProvider>,
    concurrency: usize,
    retries: u32,
}

impl DetailEnricher {
    pub fn new(provider: Arc<dyn MetadataProvider>, concurrency: usize, retries: u32) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
            retries,
        }
    }

    /// Fetches metadata for every id; ids whose lookup failed are absent from the map
    ///
    /// Dropping the returned future aborts every in-flight lookup.
    pub async fn fetch_bulk(&self, ids: &BTreeSet<ItemId>) -> HashMap<ItemId, ItemMetadata> {
        if ids.is_empty() {
            return HashMap::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for id in ids.iter().copied() {
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let retries = self.retries;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (id, Err(SourceError::Upstream("enrichment closed".to_string())))
                    }
                };
                (id, fetch_with_retries(provider.as_ref(), id, retries).await)
            });
        }

        let mut metadata = HashMap::with_capacity(ids.len());
        let mut failures = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(meta))) => {
                    metadata.insert(id, meta);
                }
                Ok((id, Err(e))) => {
                    failures += 1;
                    tracing::debug!(item_id = %id, error = %e, "Metadata lookup failed");
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, "Metadata task did not complete");
                }
            }
        }

        if failures > 0 {
            tracing::warn!(
                source = "metadata",
                requested = ids.len(),
                failed = failures,
                "Partial metadata enrichment"
            );
        }

        metadata
    }

    /// Attaches metadata to each candidate, leaving `None` where the lookup failed
    pub async fn enrich(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        let ids: BTreeSet<ItemId> = candidates.iter().map(|c| c.id).collect();
        let mut metadata = self.fetch_bulk(&ids).await;

        for candidate in &mut candidates {
            candidate.metadata = metadata.remove(&candidate.id);
        }

        candidates
    }

    /// Single lookup sharing the retry policy, `None` on failure
    pub async fn fetch_one(&self, id: ItemId) -> Option<ItemMetadata> {
        match fetch_with_retries(self.provider.as_ref(), id, self.retries).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(item_id = %id, source = "metadata", error = %e, "Metadata lookup failed");
                None
            }
        }
    }
}

async fn fetch_with_retries(
    provider: &dyn MetadataProvider,
    id: ItemId,
    retries: u32,
) -> SourceResult<ItemMetadata> {
    let mut attempt = 0;
    loop {
        match provider.details(id).await {
            Ok(meta) => return Ok(meta),
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::debug!(item_id = %id, attempt, error = %e, "Retrying metadata lookup");
            }
            Err(e) => return Err(e),
        }
    }
}
