//! Sub-score computation and weighted fusion
//!
//! Three raw signals per candidate:
//! - social: log-damped co-mention weight to the seed set
//! - content: vote-count-adjusted rating plus a popularity term
//! - personal: closeness to the nearest seed and to the profile's genre mix
//!
//! Each signal is min-max normalized across the pool before fusion, so scores
//! are only comparable within one request.

use crate::{
    models::{Candidate, ItemMetadata, ScoredCandidate, SourceTag, TasteProfile, Weights},
    services::{
        affinity::{similarity, taste_vector_similarity},
        generators::SocialAffinity,
    },
};

/// Global mean the rating shrinks toward
const PRIOR_MEAN_RATING: f64 = 6.5;
/// Votes needed before the item's own average dominates
const PRIOR_VOTES: f64 = 50.0;
const POPULARITY_WEIGHT: f64 = 0.5;
const BEST_SEED_WEIGHT: f64 = 0.7;
const TASTE_VECTOR_WEIGHT: f64 = 0.3;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Bayesian rating: `(v/(v+m))·R + (m/(v+m))·C`, or 0 without votes
pub fn confidence_rating(vote_average: Option<f64>, vote_count: Option<u64>) -> f64 {
    let v = vote_count.unwrap_or(0) as f64;
    if v == 0.0 {
        return 0.0;
    }
    let r = finite_or_zero(vote_average.unwrap_or(0.0));
    (v / (v + PRIOR_VOTES)) * r + (PRIOR_VOTES / (v + PRIOR_VOTES)) * PRIOR_MEAN_RATING
}

pub fn social_raw(candidate: &Candidate, affinity: &SocialAffinity) -> f64 {
    let weight = match candidate.source_tag {
        SourceTag::Social => candidate.raw_score,
        _ => affinity.get(&candidate.id).copied().unwrap_or(0.0),
    };
    (1.0 + finite_or_zero(weight).max(0.0)).log10()
}

pub fn content_raw(meta: Option<&ItemMetadata>) -> f64 {
    let Some(meta) = meta else {
        return 0.0;
    };
    let popularity = finite_or_zero(meta.popularity.unwrap_or(0.0)).max(0.0);
    confidence_rating(meta.vote_average, meta.vote_count) + POPULARITY_WEIGHT * (1.0 + popularity).log10()
}

pub fn personal_raw(meta: Option<&ItemMetadata>, profile: &TasteProfile) -> f64 {
    let Some(meta) = meta else {
        return 0.0;
    };

    let best_seed = profile
        .seeds_with_metadata()
        .map(|(_, seed)| similarity(meta, seed))
        .fold(0.0_f64, f64::max);

    BEST_SEED_WEIGHT * best_seed + TASTE_VECTOR_WEIGHT * taste_vector_similarity(profile.genre_weights(), meta)
}

/// Min-max normalization to [0, 1]; a constant vector maps to all zeros
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));

    let range = max - min;
    if !range.is_finite() || range <= f64::EPSILON {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|v| ((v - min) / range).clamp(0.0, 1.0))
        .collect()
}

/// Scores one candidate pool against a profile
pub struct Scorer<'a> {
    profile: &'a TasteProfile,
    affinity: &'a SocialAffinity,
}

impl<'a> Scorer<'a> {
    pub fn new(profile: &'a TasteProfile, affinity: &'a SocialAffinity) -> Self {
        Self { profile, affinity }
    }

    /// Scores every candidate, preserving pool order
    ///
    /// `weights` are renormalized before use.
    pub fn score(&self, candidates: Vec<Candidate>, weights: &Weights) -> Vec<ScoredCandidate> {
        let weights = weights.normalized();

        let social: Vec<f64> = candidates.iter().map(|c| social_raw(c, self.affinity)).collect();
        let content: Vec<f64> = candidates
            .iter()
            .map(|c| content_raw(c.metadata.as_ref()))
            .collect();
        let personal: Vec<f64> = candidates
            .iter()
            .map(|c| personal_raw(c.metadata.as_ref(), self.profile))
            .collect();

        let social = min_max_normalize(&social);
        let content = min_max_normalize(&content);
        let personal = min_max_normalize(&personal);

        candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| {
                let composite = weights.social * social[i]
                    + weights.content * content[i]
                    + weights.personal * personal[i];

                ScoredCandidate {
                    candidate,
                    social_score: social[i],
                    content_score: content[i],
                    personal_score: personal[i],
                    composite_score: composite.clamp(0.0, 1.0),
                }
            })
            .collect()
    }
}
