//! Maximal Marginal Relevance selection

use crate::{models::ScoredCandidate, services::affinity::similarity_opt};

/// Picks up to `k` candidates balancing relevance against redundancy
///
/// Each round takes the candidate maximizing
/// `λ·composite − (1−λ)·max similarity to already selected items`.
/// `λ` is clamped to [0, 1]; at 1 this is a stable sort by composite score.
/// Ties go to the candidate that comes first in `pool`.
pub fn mmr_select(pool: Vec<ScoredCandidate>, k: usize, lambda: f64) -> Vec<ScoredCandidate> {
    let lambda = if lambda.is_finite() { lambda.clamp(0.0, 1.0) } else { 1.0 };
    let k = k.min(pool.len());

    if k == 0 {
        return Vec::new();
    }

    if lambda >= 1.0 {
        let mut ranked = pool;
        ranked.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
        ranked.truncate(k);
        return ranked;
    }

    // (candidate, max similarity to anything selected so far)
    let mut remaining: Vec<(ScoredCandidate, f64)> = pool.into_iter().map(|c| (c, 0.0)).collect();
    let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(k);

    while selected.len() < k && !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_value = f64::NEG_INFINITY;

        for (idx, (candidate, max_sim)) in remaining.iter().enumerate() {
            let value = lambda * candidate.composite_score - (1.0 - lambda) * max_sim;
            if value > best_value {
                best_value = value;
                best_idx = idx;
            }
        }

        let (picked, _) = remaining.remove(best_idx);

        for (candidate, max_sim) in remaining.iter_mut() {
            let sim = similarity_opt(candidate.metadata(), picked.metadata());
            if sim > *max_sim {
                *max_sim = sim;
            }
        }

        selected.push(picked);
    }

    selected
}
