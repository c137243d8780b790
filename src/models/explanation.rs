use serde::{Deserialize, Serialize};

use super::{GenreId, ItemId};

/// Whether the explanation is anchored on the user's favorites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationKind {
    Personalized,
    Generic,
}

/// A seed item that justifies a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: ItemId,
    pub title: String,
    pub similarity: f64,
    pub social_weight: f64,
    pub score: f64,
    pub shared_genres: Vec<GenreId>,
}

/// count / max / avg of one signal across anchors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub count: usize,
    pub max: f64,
    pub avg: f64,
}

impl SignalSummary {
    /// Summarizes the strictly positive values; zeros are absent signals
    pub fn from_values(values: &[f64]) -> Self {
        let present: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
        if present.is_empty() {
            return Self::default();
        }
        Self {
            count: present.len(),
            max: present.iter().copied().fold(0.0_f64, f64::max),
            avg: present.iter().sum::<f64>() / present.len() as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorStats {
    pub similarity: SignalSummary,
    pub social_weight: SignalSummary,
}

/// Deterministic justification of why an item was suggested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub target_id: ItemId,
    pub title: String,
    pub kind: ExplanationKind,
    pub anchors: Vec<Anchor>,
    pub shared_genres: Vec<GenreId>,
    pub stats: AnchorStats,
    pub sentences: Vec<String>,
}
