//! Deterministic "why this was suggested" explanations
//!
//! Anchors are the favorites that best justify a target: ranked by
//! `0.7·similarity + 0.3·log10(1 + co-mention weight)` over at most
//! [`MAX_SEEDS_CONSIDERED`] seeds, keeping the top [`MAX_ANCHORS`] above
//! [`MIN_ANCHOR_SCORE`]. A favorite with neither a shared genre nor a
//! co-mention edge is never an anchor. Without useful anchors the explanation
//! falls back to the target's own genres and rating.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    models::{
        genre::genre_names, Anchor, AnchorStats, ExplanationKind, ExplanationResult, GenreId,
        ItemId, ItemMetadata, SignalSummary, TasteProfile, TrendingWindow,
    },
    services::{
        affinity::similarity_opt,
        enrichment::DetailEnricher,
        generators::absorb,
        providers::{SocialSignalStore, TrendingFeed},
    },
};

pub const MAX_SEEDS_CONSIDERED: usize = 30;
pub const MAX_ANCHORS: usize = 3;
pub const MIN_ANCHOR_SCORE: f64 = 0.05;

const SIMILARITY_WEIGHT: f64 = 0.7;
const SOCIAL_WEIGHT: f64 = 0.3;
const MAX_GENRES_NAMED: usize = 3;
const PRAISE_MIN_AVERAGE: f64 = 7.0;
const PRAISE_MIN_VOTES: u64 = 500;
const TRENDING_LINE: &str = "Trending now.";

#[derive(Clone)]
pub struct Explainer {
    enricher: DetailEnricher,
    social: Arc<dyn SocialSignalStore>,
    trending: Arc<dyn TrendingFeed>,
    window: TrendingWindow,
}

impl Explainer {
    pub fn new(
        enricher: DetailEnricher,
        social: Arc<dyn SocialSignalStore>,
        trending: Arc<dyn TrendingFeed>,
        window: TrendingWindow,
    ) -> Self {
        Self {
            enricher,
            social,
            trending,
            window,
        }
    }

    /// Explains `target` against the profile's seeds
    ///
    /// Metadata and graph failures degrade the explanation, never fail it.
    pub async fn explain(&self, profile: &TasteProfile, target: ItemId) -> ExplanationResult {
        let target_set: BTreeSet<ItemId> = [target].into_iter().collect();

        let (target_meta, edges, trending) = tokio::join!(
            self.enricher.fetch_one(target),
            self.social.edges_for(&target_set),
            self.trending.trending(self.window),
        );
        let edges = absorb("social", edges);
        let is_trending = absorb("trending", trending).iter().any(|t| t.id == target);

        let mut social_weights: HashMap<ItemId, f64> = HashMap::new();
        for edge in &edges {
            if let Some(other) = edge.other(target) {
                *social_weights.entry(other).or_default() += edge.weight.max(0.0);
            }
        }

        let seeds: Vec<(ItemId, Option<&ItemMetadata>)> = profile
            .seed_ids()
            .iter()
            .filter(|id| **id != target)
            .take(MAX_SEEDS_CONSIDERED)
            .map(|id| (*id, profile.seed_metadata(id)))
            .collect();

        let anchors = rank_anchors(target_meta.as_ref(), &seeds, &social_weights);

        let mut result = if anchors.is_empty() {
            generic_explanation(target, target_meta.as_ref())
        } else {
            personalized_explanation(target, target_meta.as_ref(), anchors)
        };

        if is_trending {
            result.sentences.push(TRENDING_LINE.to_string());
        }
        result
    }
}

fn rank_anchors(
    target: Option<&ItemMetadata>,
    seeds: &[(ItemId, Option<&ItemMetadata>)],
    social_weights: &HashMap<ItemId, f64>,
) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = seeds
        .iter()
        .map(|(id, meta)| {
            let similarity = similarity_opt(target, *meta);
            let social_weight = social_weights.get(id).copied().unwrap_or(0.0);
            let score = SIMILARITY_WEIGHT * similarity + SOCIAL_WEIGHT * (1.0 + social_weight).log10();

            Anchor {
                id: *id,
                title: ItemMetadata::display_title(*meta, *id),
                similarity,
                social_weight,
                score,
                shared_genres: shared_genres(target, *meta),
            }
        })
        .filter(|anchor| {
            (anchor.social_weight > 0.0 || !anchor.shared_genres.is_empty())
                && anchor.score >= MIN_ANCHOR_SCORE
        })
        .collect();

    // Seeds arrive in ascending id order; the stable sort keeps that on ties
    anchors.sort_by(|a, b| b.score.total_cmp(&a.score));
    anchors.truncate(MAX_ANCHORS);
    anchors
}

fn shared_genres(a: Option<&ItemMetadata>, b: Option<&ItemMetadata>) -> Vec<GenreId> {
    match (a, b) {
        (Some(a), Some(b)) => a.genre_ids.intersection(&b.genre_ids).copied().collect(),
        _ => Vec::new(),
    }
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

fn praise_line(meta: Option<&ItemMetadata>) -> Option<String> {
    let meta = meta?;
    let average = meta.vote_average?;
    let votes = meta.vote_count?;

    (average >= PRAISE_MIN_AVERAGE && votes >= PRAISE_MIN_VOTES)
        .then(|| format!("Highly rated: {:.1}/10 from {} votes.", average, votes))
}

fn personalized_explanation(
    target: ItemId,
    target_meta: Option<&ItemMetadata>,
    anchors: Vec<Anchor>,
) -> ExplanationResult {
    let title = ItemMetadata::display_title(target_meta, target);

    let shared: BTreeSet<GenreId> = anchors
        .iter()
        .flat_map(|a| a.shared_genres.iter().copied())
        .collect();
    let shared_genres: Vec<GenreId> = shared.into_iter().collect();

    let similarities: Vec<f64> = anchors.iter().map(|a| a.similarity).collect();
    let social: Vec<f64> = anchors.iter().map(|a| a.social_weight).collect();
    let stats = AnchorStats {
        similarity: SignalSummary::from_values(&similarities),
        social_weight: SignalSummary::from_values(&social),
    };

    let anchor_titles: Vec<String> = anchors.iter().map(|a| a.title.clone()).collect();
    let mut sentences = vec![format!(
        "Because you liked {}, you might enjoy {}.",
        join_names(&anchor_titles),
        title
    )];

    let genre_labels = genre_names(shared_genres.iter().take(MAX_GENRES_NAMED));
    if !genre_labels.is_empty() {
        sentences.push(format!("Shares genres like {}.", genre_labels.join(", ")));
    }

    let discussed: Vec<String> = anchors
        .iter()
        .filter(|a| a.social_weight > 0.0)
        .map(|a| a.title.clone())
        .collect();
    if !discussed.is_empty() {
        sentences.push(format!(
            "Fans often discuss it alongside {}.",
            join_names(&discussed)
        ));
    }

    sentences.extend(praise_line(target_meta));

    ExplanationResult {
        target_id: target,
        title,
        kind: ExplanationKind::Personalized,
        anchors,
        shared_genres,
        stats,
        sentences,
    }
}

fn generic_explanation(target: ItemId, target_meta: Option<&ItemMetadata>) -> ExplanationResult {
    let title = ItemMetadata::display_title(target_meta, target);

    let genre_labels = target_meta
        .map(|m| genre_names(m.genre_ids.iter().take(MAX_GENRES_NAMED)))
        .unwrap_or_default();

    let mut sentences = Vec::new();
    if genre_labels.is_empty() {
        sentences.push(format!("{} is popular with viewers right now.", title));
    } else {
        sentences.push(format!("{} is a {} series.", title, genre_labels.join(" / ")));
    }
    sentences.extend(praise_line(target_meta));

    ExplanationResult {
        target_id: target,
        title,
        kind: ExplanationKind::Generic,
        anchors: Vec::new(),
        shared_genres: Vec::new(),
        stats: AnchorStats::default(),
        sentences,
    }
}
