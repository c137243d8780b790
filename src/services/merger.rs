use std::collections::HashMap;

use crate::models::{BlockSet, Candidate, ItemId, SourceCounts};

/// Raw generator output of one request, kept per source
#[derive(Debug, Clone, Default)]
pub struct GeneratedCandidates {
    pub social: Vec<Candidate>,
    pub similarity: Vec<Candidate>,
    pub trending: Vec<Candidate>,
}

impl GeneratedCandidates {
    pub fn counts(&self) -> SourceCounts {
        SourceCounts {
            social: self.social.len(),
            similarity: self.similarity.len(),
            trending: self.trending.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.social.is_empty() && self.similarity.is_empty() && self.trending.is_empty()
    }
}

/// Deduplicates candidates across sources
///
/// Sources are applied trending, then similarity, then social, each write
/// replacing the record for that id, so the highest-priority source wins and
/// its raw score is kept as is. The output lists social ids first, then
/// similarity, then trending, each in generator order. Blocked ids are
/// dropped.
pub fn merge(generated: GeneratedCandidates, block: &BlockSet) -> Vec<Candidate> {
    let GeneratedCandidates {
        social,
        similarity,
        trending,
    } = generated;

    let order: Vec<ItemId> = social
        .iter()
        .chain(similarity.iter())
        .chain(trending.iter())
        .map(|c| c.id)
        .collect();

    let mut records: HashMap<ItemId, Candidate> = HashMap::with_capacity(order.len());
    for candidate in trending.into_iter().chain(similarity).chain(social) {
        records.insert(candidate.id, candidate);
    }

    order
        .into_iter()
        .filter(|id| !block.contains(id))
        .filter_map(|id| records.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTag;

    fn c(id: u64, tag: SourceTag, raw: f64) -> Candidate {
        Candidate::new(ItemId(id), tag, raw)
    }

    #[test]
    fn test_social_wins_over_trending() {
        let generated = GeneratedCandidates {
            social: vec![c(555, SourceTag::Social, 5.0)],
            similarity: vec![],
            trending: vec![c(555, SourceTag::Trending, 0.4)],
        };

        let merged = merge(generated, &BlockSet::default());

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source_tag, SourceTag::Social);
        assert_eq!(merged[0].raw_score, 5.0);
    }

    #[test]
    fn test_similarity_wins_over_trending_without_summing() {
        let generated = GeneratedCandidates {
            social: vec![],
            similarity: vec![c(9, SourceTag::Similarity, 1.0)],
            trending: vec![c(9, SourceTag::Trending, 0.9)],
        };

        let merged = merge(generated, &BlockSet::default());
        assert_eq!(merged[0].source_tag, SourceTag::Similarity);
        assert_eq!(merged[0].raw_score, 1.0);
    }

    #[test]
    fn test_one_record_per_id_in_priority_order() {
        let generated = GeneratedCandidates {
            social: vec![c(3, SourceTag::Social, 2.0), c(1, SourceTag::Social, 1.0)],
            similarity: vec![c(4, SourceTag::Similarity, 1.0), c(3, SourceTag::Similarity, 1.0)],
            trending: vec![c(5, SourceTag::Trending, 0.5), c(4, SourceTag::Trending, 0.5)],
        };

        let merged = merge(generated, &BlockSet::default());
        let ids: Vec<u64> = merged.iter().map(|c| c.id.0).collect();

        assert_eq!(ids, vec![3, 1, 4, 5]);
        assert_eq!(merged[2].source_tag, SourceTag::Similarity);
    }

    #[test]
    fn test_blocked_ids_never_survive() {
        let generated = GeneratedCandidates {
            social: vec![c(777, SourceTag::Social, 100.0)],
            similarity: vec![c(777, SourceTag::Similarity, 1.0), c(8, SourceTag::Similarity, 1.0)],
            trending: vec![c(777, SourceTag::Trending, 1.0)],
        };
        let block: BlockSet = [ItemId(777)].into_iter().collect();

        let merged = merge(generated, &block);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, ItemId(8));
    }

    #[test]
    fn test_counts_are_per_source() {
        let generated = GeneratedCandidates {
            social: vec![c(1, SourceTag::Social, 1.0)],
            similarity: vec![],
            trending: vec![c(2, SourceTag::Trending, 0.3), c(3, SourceTag::Trending, 0.3)],
        };
        let counts = generated.counts();
        assert_eq!((counts.social, counts.similarity, counts.trending), (1, 0, 2));
        assert!(!generated.is_empty());
        assert!(GeneratedCandidates::default().is_empty());
    }
}
