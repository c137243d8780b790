use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, ScoredCandidate};

/// Caller-supplied fusion weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub social: f64,
    pub content: f64,
    pub personal: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            social: 0.5,
            content: 0.5,
            personal: 0.3,
        }
    }
}

impl Weights {
    /// Rescales the weights so they sum to 1
    ///
    /// Negative or non-finite components count as 0. When nothing positive
    /// remains the fusion falls back to social only.
    pub fn normalized(&self) -> Weights {
        let clean = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let (social, content, personal) = (clean(self.social), clean(self.content), clean(self.personal));
        let sum = social + content + personal;

        if sum <= 0.0 {
            return Weights {
                social: 1.0,
                content: 0.0,
                personal: 0.0,
            };
        }

        Weights {
            social: social / sum,
            content: content / sum,
            personal: personal / sum,
        }
    }
}

/// Why a recommendation list came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Fewer qualifying seed items than the configured minimum
    InsufficientSeed,
    /// Every generator came back empty after filtering
    NoCandidates,
}

/// Number of candidates each generator contributed before merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub social: usize,
    pub similarity: usize,
    pub trending: usize,
}

/// Diagnostic summary attached to every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationMeta {
    pub seed_count: usize,
    pub min_seeds: usize,
    #[serde(default)]
    pub sources: SourceCounts,
    #[serde(default)]
    pub pool_size: usize,
    /// Weights after renormalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Weights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    pub generated_at: DateTime<Utc>,
}

impl RecommendationMeta {
    pub fn new(seed_count: usize, min_seeds: usize) -> Self {
        Self {
            seed_count,
            min_seeds,
            sources: SourceCounts::default(),
            pool_size: 0,
            weights: None,
            lambda: None,
            generated_at: Utc::now(),
        }
    }
}

/// Ordered recommendation list for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub items: Vec<ScoredCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EmptyReason>,
    pub meta: RecommendationMeta,
}

impl RecommendationResult {
    pub fn empty(reason: EmptyReason, meta: RecommendationMeta) -> Self {
        Self {
            items: Vec::new(),
            reason: Some(reason),
            meta,
        }
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id()).collect()
    }
}
