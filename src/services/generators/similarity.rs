//! "More like this" lookups for a bounded number of seeds

use std::{collections::HashSet, sync::Arc};

use futures::future::join_all;

use crate::{
    error::SourceResult,
    models::{BlockSet, Candidate, ItemId, SourceTag, TasteProfile},
    services::providers::SimilarityService,
};

/// Placeholder relevance; quality scoring differentiates these candidates
pub const SIMILARITY_RAW_SCORE: f64 = 1.0;

#[derive(Clone)]
pub struct SimilarityGenerator {
    service: Arc<dyn SimilarityService>,
    max_seeds: usize,
    per_seed: usize,
}

impl SimilarityGenerator {
    pub fn new(service: Arc<dyn SimilarityService>, max_seeds: usize, per_seed: usize) -> Self {
        Self {
            service,
            max_seeds,
            per_seed,
        }
    }

    /// Unions related items of the first `max_seeds` seeds (ascending id)
    ///
    /// Seeds whose lookup fails are skipped. The source only fails as a whole
    /// when every lookup failed.
    pub async fn generate(&self, profile: &TasteProfile, block: &BlockSet) -> SourceResult<Vec<Candidate>> {
        let seeds: Vec<ItemId> = profile
            .seed_ids()
            .iter()
            .copied()
            .take(self.max_seeds)
            .collect();

        if seeds.is_empty() || self.per_seed == 0 {
            return Ok(Vec::new());
        }

        let lookups = seeds
            .iter()
            .map(|seed| self.service.similar_items(*seed, self.per_seed));
        let results = join_all(lookups).await;

        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut candidates = Vec::new();
        let mut first_error = None;
        let mut failed = 0usize;

        for (seed, result) in seeds.iter().zip(results) {
            let related = match result {
                Ok(related) => related,
                Err(e) => {
                    failed += 1;
                    tracing::debug!(seed = %seed, error = %e, "Similar lookup failed");
                    first_error.get_or_insert(e);
                    continue;
                }
            };

            for id in related.into_iter().take(self.per_seed) {
                if block.contains(&id) || profile.is_seed(&id) || !seen.insert(id) {
                    continue;
                }
                candidates.push(Candidate::new(id, SourceTag::Similarity, SIMILARITY_RAW_SCORE));
            }
        }

        if failed == seeds.len() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        tracing::debug!(
            seeds = seeds.len(),
            failed,
            candidates = candidates.len(),
            "Similarity candidates generated"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SourceError, services::providers::MockSimilarityService};
    use std::collections::HashMap;

    fn profile(seeds: &[u64]) -> TasteProfile {
        TasteProfile::new(seeds.iter().copied().map(ItemId).collect(), HashMap::new())
    }

    fn ids(candidates: &[Candidate]) -> Vec<u64> {
        candidates.iter().map(|c| c.id.0).collect()
    }

    #[tokio::test]
    async fn test_union_excludes_seeds_and_blocked() {
        let mut service = MockSimilarityService::new();
        service.expect_similar_items().returning(|seed, _| {
            Ok(match seed.0 {
                100 => vec![ItemId(1), ItemId(101), ItemId(2)],
                101 => vec![ItemId(2), ItemId(777), ItemId(3)],
                _ => vec![],
            })
        });

        let generator = SimilarityGenerator::new(Arc::new(service), 10, 20);
        let block: BlockSet = [ItemId(777)].into_iter().collect();

        let out = generator.generate(&profile(&[100, 101, 102]), &block).await.unwrap();

        assert_eq!(ids(&out), vec![1, 2, 3]);
        assert!(out
            .iter()
            .all(|c| c.source_tag == SourceTag::Similarity && c.raw_score == SIMILARITY_RAW_SCORE));
    }

    #[tokio::test]
    async fn test_queries_at_most_max_seeds() {
        let mut service = MockSimilarityService::new();
        service
            .expect_similar_items()
            .times(2)
            .returning(|seed, max| {
                assert_eq!(max, 5);
                Ok(vec![ItemId(seed.0 + 1000)])
            });

        let generator = SimilarityGenerator::new(Arc::new(service), 2, 5);
        let out = generator
            .generate(&profile(&[30, 10, 20]), &BlockSet::default())
            .await
            .unwrap();

        // Lowest seed ids are queried first
        assert_eq!(ids(&out), vec![1010, 1020]);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_seeds() {
        let mut service = MockSimilarityService::new();
        service.expect_similar_items().returning(|seed, _| {
            if seed.0 == 100 {
                Err(SourceError::Upstream("429".to_string()))
            } else {
                Ok(vec![ItemId(5)])
            }
        });

        let generator = SimilarityGenerator::new(Arc::new(service), 10, 20);
        let out = generator
            .generate(&profile(&[100, 101]), &BlockSet::default())
            .await
            .unwrap();
        assert_eq!(ids(&out), vec![5]);
    }

    #[tokio::test]
    async fn test_total_failure_is_reported() {
        let mut service = MockSimilarityService::new();
        service
            .expect_similar_items()
            .returning(|_, _| Err(SourceError::Upstream("503".to_string())));

        let generator = SimilarityGenerator::new(Arc::new(service), 10, 20);
        let result = generator.generate(&profile(&[1, 2]), &BlockSet::default()).await;
        tokio_test::assert_err!(result);
    }
}
