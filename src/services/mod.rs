pub mod affinity;
pub mod diversity;
pub mod enrichment;
pub mod explain;
pub mod generators;
pub mod merger;
pub mod profile;
pub mod providers;
pub mod recommendations;
pub mod scoring;

pub use recommendations::{Collaborators, RecommendationEngine};
