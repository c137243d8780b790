use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{ItemId, ItemMetadata};

/// Generator that proposed a candidate
///
/// Variants are declared in ascending merge priority: on conflict a later
/// variant overwrites an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Trending,
    Similarity,
    Social,
}

impl Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTag::Trending => write!(f, "trending"),
            SourceTag::Similarity => write!(f, "similarity"),
            SourceTag::Social => write!(f, "social"),
        }
    }
}

/// A catalogue item proposed for recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: ItemId,
    pub source_tag: SourceTag,
    pub raw_score: f64,
    /// Filled by enrichment; `None` means the lookup failed or was skipped
    #[serde(default)]
    pub metadata: Option<ItemMetadata>,
}

impl Candidate {
    pub fn new(id: ItemId, source_tag: SourceTag, raw_score: f64) -> Self {
        Self {
            id,
            source_tag,
            raw_score,
            metadata: None,
        }
    }
}

/// Candidate with its normalized sub-scores and fused composite score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub social_score: f64,
    pub content_score: f64,
    pub personal_score: f64,
    pub composite_score: f64,
}

impl ScoredCandidate {
    pub fn id(&self) -> ItemId {
        self.candidate.id
    }

    pub fn metadata(&self) -> Option<&ItemMetadata> {
        self.candidate.metadata.as_ref()
    }
}
