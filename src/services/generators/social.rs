//! Co-mention graph walk from the user's seeds

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::SourceResult,
    models::{BlockSet, Candidate, ItemId, SourceTag, TasteProfile},
    services::providers::SocialSignalStore,
};

/// Summed co-mention weight between each neighbor and the seed set
///
/// Untruncated, so the scorer can look up a social signal for candidates
/// that reached the pool through another source.
pub type SocialAffinity = HashMap<ItemId, f64>;

#[derive(Debug, Clone, Default)]
pub struct SocialOutput {
    /// Best neighbors by weight, at most `keep`
    pub candidates: Vec<Candidate>,
    pub affinity: SocialAffinity,
}

#[derive(Clone)]
pub struct SocialGraphGenerator {
    store: Arc<dyn SocialSignalStore>,
}

impl SocialGraphGenerator {
    pub fn new(store: Arc<dyn SocialSignalStore>) -> Self {
        Self { store }
    }

    pub async fn generate(
        &self,
        profile: &TasteProfile,
        block: &BlockSet,
        keep: usize,
    ) -> SourceResult<SocialOutput> {
        if keep == 0 {
            return Ok(SocialOutput::default());
        }

        if profile.seed_ids().is_empty() {
            return self.popular(block, keep).await;
        }

        let seeds = profile.seed_ids();
        let edges = self.store.edges_for(seeds).await?;

        let mut affinity = SocialAffinity::new();
        for edge in &edges {
            let a_seed = seeds.contains(&edge.item_a);
            let b_seed = seeds.contains(&edge.item_b);

            let neighbor = match (a_seed, b_seed) {
                (true, false) => edge.item_b,
                (false, true) => edge.item_a,
                _ => continue,
            };
            if block.contains(&neighbor) {
                continue;
            }

            *affinity.entry(neighbor).or_default() += edge.weight.max(0.0);
        }

        let mut ranked: Vec<(ItemId, f64)> = affinity.iter().map(|(id, w)| (*id, *w)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(keep);

        let candidates = ranked
            .into_iter()
            .map(|(id, weight)| Candidate::new(id, SourceTag::Social, weight))
            .collect::<Vec<_>>();

        tracing::debug!(
            edges = edges.len(),
            neighbors = affinity.len(),
            kept = candidates.len(),
            "Social candidates generated"
        );

        Ok(SocialOutput {
            candidates,
            affinity,
        })
    }

    /// Seedless fallback: globally most co-mentioned items
    async fn popular(&self, block: &BlockSet, keep: usize) -> SourceResult<SocialOutput> {
        let ranked = self.store.popular(keep + block.len()).await?;

        let candidates = ranked
            .into_iter()
            .filter(|(id, _)| !block.contains(id))
            .take(keep)
            .map(|(id, score)| Candidate::new(id, SourceTag::Social, score.max(0.0)))
            .collect::<Vec<_>>();

        tracing::debug!(kept = candidates.len(), "Social popularity fallback used");

        Ok(SocialOutput {
            candidates,
            affinity: SocialAffinity::new(),
        })
    }
}
