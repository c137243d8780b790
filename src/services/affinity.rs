//! Item-to-item and item-to-profile similarity on genre sets.

use std::collections::BTreeMap;

use crate::models::{GenreId, ItemMetadata};

const WEAK_OVERLAP_PENALTY: f64 = 0.6;
const STRONG_OVERLAP_BONUS: f64 = 1.1;
const STRONG_OVERLAP_MIN_SHARED: usize = 3;
const SAME_LANGUAGE_BONUS: f64 = 0.1;

/// Genre Jaccard with overlap-strength adjustment and a same-language bonus
///
/// A single shared genre is a weak signal and is damped; three or more shared
/// genres are boosted. The result is clamped to [0, 1].
pub fn similarity(a: &ItemMetadata, b: &ItemMetadata) -> f64 {
    let shared = a.genre_ids.intersection(&b.genre_ids).count();
    let union = a.genre_ids.union(&b.genre_ids).count();

    let mut score = if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    };

    if shared == 1 {
        score *= WEAK_OVERLAP_PENALTY;
    } else if shared >= STRONG_OVERLAP_MIN_SHARED {
        score *= STRONG_OVERLAP_BONUS;
    }

    if let (Some(la), Some(lb)) = (&a.language, &b.language) {
        if la == lb {
            score += SAME_LANGUAGE_BONUS;
        }
    }

    score.clamp(0.0, 1.0)
}

/// [`similarity`] where missing metadata on either side scores 0
pub fn similarity_opt(a: Option<&ItemMetadata>, b: Option<&ItemMetadata>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => similarity(a, b),
        _ => 0.0,
    }
}

/// Cosine-style match between a candidate's genres and the profile genre counts
///
/// The candidate is treated as a binary genre vector.
pub fn taste_vector_similarity(genre_weights: &BTreeMap<GenreId, u32>, candidate: &ItemMetadata) -> f64 {
    if genre_weights.is_empty() || candidate.genre_ids.is_empty() {
        return 0.0;
    }

    let dot: f64 = candidate
        .genre_ids
        .iter()
        .filter_map(|g| genre_weights.get(g))
        .map(|w| f64::from(*w))
        .sum();

    let profile_norm = genre_weights
        .values()
        .map(|w| f64::from(*w).powi(2))
        .sum::<f64>()
        .sqrt();
    let candidate_norm = (candidate.genre_ids.len() as f64).sqrt();

    if profile_norm == 0.0 {
        return 0.0;
    }

    (dot / (profile_norm * candidate_norm)).clamp(0.0, 1.0)
}
