use serde::Deserialize;

pub mod candidate;
pub mod explanation;
pub mod genre;
pub mod item;
pub mod profile;
pub mod recommendation;

pub use candidate::{Candidate, ScoredCandidate, SourceTag};
pub use explanation::{Anchor, AnchorStats, ExplanationKind, ExplanationResult, SignalSummary};
pub use item::{
    normalize_language, GenreId, ItemId, ItemMetadata, SocialEdge, TrendingItem, TrendingWindow,
};
pub use profile::{BlockSet, LibrarySnapshot, TasteProfile, UserId};
pub use recommendation::{
    EmptyReason, RecommendationMeta, RecommendationResult, SourceCounts, Weights,
};

const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

// ============================================================================
// TMDb API Types
// ============================================================================

/// Paged list envelope used by TMDb list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// Show entry inside `/similar` and `/trending` lists
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbShowSummary {
    pub id: u64,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<GenreId>,
    #[serde(default)]
    pub popularity: Option<f64>,
}

impl From<TmdbShowSummary> for TrendingItem {
    fn from(show: TmdbShowSummary) -> Self {
        TrendingItem {
            id: ItemId(show.id),
            language: show.original_language.as_deref().and_then(normalize_language),
            genre_ids: show.genre_ids.into_iter().collect(),
            popularity: show.popularity.unwrap_or(0.0).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub id: GenreId,
    #[serde(default)]
    #[allow(dead_code)] // Names come from the static catalogue
    pub name: Option<String>,
}

/// API response from GET /tv/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbShowDetails {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// Builds an absolute poster URL from a TMDb poster path
pub fn poster_url_from_path(path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() {
        None
    } else if path.starts_with("http://") || path.starts_with("https://") {
        Some(path.to_string())
    } else if path.starts_with('/') {
        Some(format!("{}{}", TMDB_IMAGE_BASE, path))
    } else {
        Some(format!("{}/{}", TMDB_IMAGE_BASE, path))
    }
}

impl From<TmdbShowDetails> for ItemMetadata {
    fn from(details: TmdbShowDetails) -> Self {
        let title = details
            .name
            .filter(|n| !n.trim().is_empty())
            .or(details.original_name);

        ItemMetadata {
            title,
            genre_ids: details.genres.iter().map(|g| g.id).collect(),
            language: details.original_language.as_deref().and_then(normalize_language),
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            popularity: details.popularity,
            poster_url: details.poster_path.as_deref().and_then(poster_url_from_path),
        }
    }
}
