//! Hybrid recommendation pipeline
//!
//! profile → (social ∥ similarity ∥ trending) → merge → enrich → score → MMR
//!
//! Only a failed library read or the request deadline fail a request; every
//! other source degrades to an empty contribution.

use std::{sync::Arc, time::Instant};

use crate::{
    config::RecommendConfig,
    db::ResultCache,
    error::{AppError, AppResult},
    models::{
        EmptyReason, ExplanationResult, ItemId, LibrarySnapshot, RecommendationMeta,
        RecommendationResult, UserId, Weights,
    },
    services::{
        diversity::mmr_select,
        enrichment::DetailEnricher,
        explain::{Explainer, MAX_SEEDS_CONSIDERED},
        generators::{absorb, with_timeout, SimilarityGenerator, SocialGraphGenerator, TrendingGenerator},
        merger::{merge, GeneratedCandidates},
        profile::TasteProfileBuilder,
        providers::{MetadataProvider, SimilarityService, SocialSignalStore, TrendingFeed, UserLibraryStore},
        scoring::Scorer,
    },
};

/// External systems the engine reads from
#[derive(Clone)]
pub struct Collaborators {
    pub library: Arc<dyn UserLibraryStore>,
    pub social: Arc<dyn SocialSignalStore>,
    pub similarity: Arc<dyn SimilarityService>,
    pub trending: Arc<dyn TrendingFeed>,
    pub metadata: Arc<dyn MetadataProvider>,
}

/// Cache key for a finished result
///
/// Includes the library snapshot fingerprint, so a changed library or block
/// set never reuses an older result.
pub fn result_cache_key(
    user_id: UserId,
    limit: usize,
    weights: &Weights,
    lambda: f64,
    snapshot: &LibrarySnapshot,
    liked_threshold: f64,
) -> String {
    let w = weights.normalized();
    format!(
        "{}:{}:{:016x}:{:016x}:{:016x}:{:016x}:{:016x}",
        user_id,
        limit,
        w.social.to_bits(),
        w.content.to_bits(),
        w.personal.to_bits(),
        lambda.to_bits(),
        snapshot.fingerprint(liked_threshold)
    )
}

pub struct RecommendationEngine {
    config: RecommendConfig,
    profiles: TasteProfileBuilder,
    enricher: DetailEnricher,
    social: SocialGraphGenerator,
    similarity: SimilarityGenerator,
    trending: TrendingGenerator,
    explainer: Explainer,
    result_cache: Option<Arc<dyn ResultCache>>,
}

impl RecommendationEngine {
    pub fn new(collaborators: Collaborators, config: RecommendConfig) -> Self {
        let enricher = DetailEnricher::new(
            collaborators.metadata,
            config.enrich_concurrency,
            config.metadata_retries,
        );

        Self {
            profiles: TasteProfileBuilder::new(collaborators.library, config.liked_rating_threshold),
            social: SocialGraphGenerator::new(Arc::clone(&collaborators.social)),
            similarity: SimilarityGenerator::new(
                collaborators.similarity,
                config.max_seeds_queried,
                config.similar_per_seed,
            ),
            trending: TrendingGenerator::new(
                Arc::clone(&collaborators.trending),
                config.trending_window,
                config.denylisted_genres.iter().copied(),
            ),
            explainer: Explainer::new(
                enricher.clone(),
                collaborators.social,
                collaborators.trending,
                config.trending_window,
            ),
            enricher,
            result_cache: None,
            config,
        }
    }

    /// Enables result caching when the configured TTL is non-zero
    pub fn with_result_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        if self.config.result_cache_ttl_secs > 0 {
            self.result_cache = Some(cache);
        }
        self
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Ranked recommendations for a user, at most `limit` items
    ///
    /// Bounded by the configured request timeout; exceeding it aborts all
    /// in-flight work and yields `AppError::Cancelled`.
    pub async fn recommend(
        &self,
        user_id: UserId,
        limit: usize,
        weights: Weights,
        lambda: f64,
    ) -> AppResult<RecommendationResult> {
        let deadline = self.config.request_timeout;

        match tokio::time::timeout(deadline, self.run_pipeline(user_id, limit, weights, lambda)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    user_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "Recommendation request cancelled"
                );
                Err(AppError::Cancelled(format!(
                    "recommendations exceeded {} ms",
                    deadline.as_millis()
                )))
            }
        }
    }

    async fn run_pipeline(
        &self,
        user_id: UserId,
        limit: usize,
        weights: Weights,
        lambda: f64,
    ) -> AppResult<RecommendationResult> {
        let started = Instant::now();
        let lambda = if lambda.is_finite() {
            lambda.clamp(0.0, 1.0)
        } else {
            self.config.mmr_lambda
        };

        let snapshot = self.profiles.load_snapshot(user_id).await?;
        let seed_ids = self.profiles.seed_ids(&snapshot);
        let mut meta = RecommendationMeta::new(seed_ids.len(), self.config.min_seeds);

        if seed_ids.len() < self.config.min_seeds {
            tracing::info!(
                user_id,
                seeds = seed_ids.len(),
                min_seeds = self.config.min_seeds,
                "Not enough seeds to recommend"
            );
            return Ok(RecommendationResult::empty(EmptyReason::InsufficientSeed, meta));
        }

        let cache_key = result_cache_key(
            user_id,
            limit,
            &weights,
            lambda,
            &snapshot,
            self.profiles.liked_rating_threshold(),
        );
        if let Some(cache) = &self.result_cache {
            if let Some(hit) = cache.get(&cache_key).await {
                tracing::debug!(user_id, "Recommendation cache hit");
                return Ok(hit);
            }
        }

        let block = snapshot.block_set();
        let profile = self.profiles.build(seed_ids, &self.enricher).await;

        let keep = limit.saturating_mul(self.config.oversample_factor);
        let per_source = self.config.generator_timeout;

        // Merge order is fixed below, independent of completion order
        let (social, similarity, trending) = tokio::join!(
            with_timeout("social", per_source, self.social.generate(&profile, &block, keep)),
            with_timeout("similarity", per_source, self.similarity.generate(&profile, &block)),
            with_timeout("trending", per_source, self.trending.generate(&profile, &block)),
        );

        let social = absorb("social", social);
        let generated = GeneratedCandidates {
            social: social.candidates,
            similarity: absorb("similarity", similarity),
            trending: absorb("trending", trending),
        };

        let normalized = weights.normalized();
        meta.sources = generated.counts();
        meta.weights = Some(normalized);
        meta.lambda = Some(lambda);

        let pool = merge(generated, &block);
        meta.pool_size = pool.len();

        if pool.is_empty() {
            tracing::info!(user_id, "Every candidate source came back empty");
            return Ok(RecommendationResult::empty(EmptyReason::NoCandidates, meta));
        }

        let pool = self.enricher.enrich(pool).await;
        let scored = Scorer::new(&profile, &social.affinity).score(pool, &normalized);
        let items = mmr_select(scored, limit, lambda);

        let result = RecommendationResult {
            items,
            reason: None,
            meta,
        };

        if let Some(cache) = &self.result_cache {
            cache.put(&cache_key, &result, self.config.result_cache_ttl_secs);
        }

        tracing::info!(
            user_id,
            items = result.items.len(),
            pool = result.meta.pool_size,
            social = result.meta.sources.social,
            similarity = result.meta.sources.similarity,
            trending = result.meta.sources.trending,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recommendations computed"
        );

        Ok(result)
    }

    /// Explains why `target` suits this user
    pub async fn explain(&self, user_id: UserId, target: ItemId) -> AppResult<ExplanationResult> {
        let deadline = self.config.request_timeout;

        let work = async {
            let snapshot = self.profiles.load_snapshot(user_id).await?;
            let seed_ids = self
                .profiles
                .seed_ids(&snapshot)
                .into_iter()
                .filter(|id| *id != target)
                .take(MAX_SEEDS_CONSIDERED)
                .collect();

            let profile = self.profiles.build(seed_ids, &self.enricher).await;
            let explanation = self.explainer.explain(&profile, target).await;

            tracing::info!(
                user_id,
                target = %target,
                anchors = explanation.anchors.len(),
                "Explanation built"
            );

            Ok::<_, AppError>(explanation)
        };

        tokio::time::timeout(deadline, work)
            .await
            .map_err(|_| AppError::Cancelled(format!("explanation exceeded {} ms", deadline.as_millis())))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{SourceError, SourceResult},
        models::{
            BlockSet, GenreId, ItemMetadata, SocialEdge, SourceTag, TrendingItem, TrendingWindow,
        },
        services::providers::{
            MockMetadataProvider, MockSimilarityService, MockSocialSignalStore, MockTrendingFeed,
            MockUserLibraryStore,
        },
    };
    use std::{
        collections::{BTreeMap, BTreeSet, HashMap},
        sync::Mutex,
        time::Duration,
    };

    fn set(ids: &[u64]) -> BTreeSet<ItemId> {
        ids.iter().copied().map(ItemId).collect()
    }

    fn library(favorites: &[u64], hidden: &[u64]) -> MockUserLibraryStore {
        let favorites = set(favorites);
        let hidden = set(hidden);
        let mut store = MockUserLibraryStore::new();
        store.expect_favorites().returning(move |_| Ok(favorites.clone()));
        store.expect_ratings().returning(|_| Ok(BTreeMap::new()));
        store.expect_hidden().returning(move |_| Ok(hidden.clone()));
        store
    }

    fn edge(a: u64, b: u64, weight: f64) -> SocialEdge {
        SocialEdge {
            item_a: ItemId(a),
            item_b: ItemId(b),
            weight,
        }
    }

    fn social(edges: Vec<SocialEdge>) -> MockSocialSignalStore {
        let mut store = MockSocialSignalStore::new();
        store.expect_edges_for().returning(move |ids| {
            Ok(edges
                .iter()
                .filter(|e| ids.contains(&e.item_a) || ids.contains(&e.item_b))
                .copied()
                .collect())
        });
        store.expect_popular().returning(|_| Ok(Vec::new()));
        store
    }

    fn similar(pairs: &[(u64, &[u64])]) -> MockSimilarityService {
        let table: HashMap<ItemId, Vec<ItemId>> = pairs
            .iter()
            .map(|(seed, related)| (ItemId(*seed), related.iter().copied().map(ItemId).collect()))
            .collect();
        let mut service = MockSimilarityService::new();
        service
            .expect_similar_items()
            .returning(move |id, _| Ok(table.get(&id).cloned().unwrap_or_default()));
        service
    }

    fn trending(items: &[(u64, f64)]) -> MockTrendingFeed {
        let items: Vec<TrendingItem> = items
            .iter()
            .map(|(id, popularity)| TrendingItem {
                id: ItemId(*id),
                language: Some("en".to_string()),
                genre_ids: [18].into_iter().collect(),
                popularity: *popularity,
            })
            .collect();
        let mut feed = MockTrendingFeed::new();
        feed.expect_trending().returning(move |_| Ok(items.clone()));
        feed
    }

    /// English drama for every id; rating rises with the id
    fn metadata() -> MockMetadataProvider {
        let mut provider = MockMetadataProvider::new();
        provider.expect_details().returning(|id| {
            let genres: BTreeSet<GenreId> = if id.0 % 2 == 0 { [18, 80].into() } else { [18].into() };
            Ok(ItemMetadata {
                title: Some(format!("Show {}", id)),
                genre_ids: genres,
                language: Some("en".to_string()),
                vote_average: Some(6.0 + (id.0 % 30) as f64 / 10.0),
                vote_count: Some(100 + id.0),
                popularity: Some(id.0 as f64 / 10.0),
                poster_url: None,
            })
        });
        provider
    }

    fn collaborators(
        library: impl UserLibraryStore + 'static,
        social: impl SocialSignalStore + 'static,
        similarity: impl SimilarityService + 'static,
        trending: impl TrendingFeed + 'static,
        metadata: impl MetadataProvider + 'static,
    ) -> Collaborators {
        Collaborators {
            library: Arc::new(library),
            social: Arc::new(social),
            similarity: Arc::new(similarity),
            trending: Arc::new(trending),
            metadata: Arc::new(metadata),
        }
    }

    fn test_config() -> RecommendConfig {
        RecommendConfig {
            result_cache_ttl_secs: 0,
            ..RecommendConfig::default()
        }
    }

    fn standard_engine(favorites: &[u64], hidden: &[u64]) -> RecommendationEngine {
        RecommendationEngine::new(
            collaborators(
                library(favorites, hidden),
                social(vec![edge(100, 500, 5.0), edge(501, 101, 2.0), edge(102, 777, 50.0)]),
                similar(&[(100, &[600, 500, 777]), (101, &[601])]),
                trending(&[(700, 80.0), (777, 900.0), (555, 0.0)]),
                metadata(),
            ),
            test_config(),
        )
    }

    #[tokio::test]
    async fn test_three_favorites_produce_bounded_result() {
        let engine = standard_engine(&[100, 101, 102], &[]);

        let result = engine
            .recommend(1, 4, Weights::default(), 0.3)
            .await
            .unwrap();

        assert!(result.reason.is_none());
        assert!(!result.items.is_empty());
        assert!(result.items.len() <= 4);
        assert_eq!(result.meta.seed_count, 3);
        assert!(result
            .items
            .iter()
            .all(|item| (0.0..=1.0).contains(&item.composite_score)));
    }

    #[tokio::test]
    async fn test_two_favorites_are_insufficient() {
        let mut similarity = MockSimilarityService::new();
        similarity.expect_similar_items().never();
        let mut social_store = MockSocialSignalStore::new();
        social_store.expect_edges_for().never();
        social_store.expect_popular().never();
        let mut feed = MockTrendingFeed::new();
        feed.expect_trending().never();

        let engine = RecommendationEngine::new(
            collaborators(library(&[100, 101], &[]), social_store, similarity, feed, metadata()),
            test_config(),
        );

        let result = engine.recommend(1, 24, Weights::default(), 0.3).await.unwrap();

        assert!(result.items.is_empty());
        assert_eq!(result.reason, Some(EmptyReason::InsufficientSeed));
        assert_eq!(result.meta.seed_count, 2);
        assert_eq!(result.meta.min_seeds, 3);
    }

    #[tokio::test]
    async fn test_social_and_trending_conflict_resolves_to_social() {
        let engine = RecommendationEngine::new(
            collaborators(
                library(&[100, 101, 102], &[]),
                social(vec![edge(100, 555, 5.0)]),
                similar(&[]),
                trending(&[(555, 0.5)]),
                metadata(),
            ),
            test_config(),
        );

        let result = engine.recommend(1, 10, Weights::default(), 1.0).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id(), ItemId(555));
        assert_eq!(result.items[0].candidate.source_tag, SourceTag::Social);
        assert_eq!(result.items[0].candidate.raw_score, 5.0);
        assert_eq!(result.meta.sources.trending, 1);
        assert_eq!(result.meta.pool_size, 1);
    }

    #[tokio::test]
    async fn test_hidden_item_never_recommended() {
        let engine = standard_engine(&[100, 101, 102], &[777]);

        for lambda in [0.0, 0.3, 1.0] {
            let result = engine
                .recommend(1, 50, Weights { social: 1.0, content: 0.0, personal: 0.0 }, lambda)
                .await
                .unwrap();

            assert!(!result.ids().contains(&ItemId(777)));
            // Favorites are blocked too
            assert!(result.ids().iter().all(|id| ![100, 101, 102].contains(&id.0)));
        }
    }

    #[tokio::test]
    async fn test_blocked_ids_absent_for_any_source_mix() {
        let block = set(&[777, 500]);
        let hidden: Vec<u64> = block.iter().map(|id| id.0).collect();
        let engine = standard_engine(&[100, 101, 102], &hidden);

        let result = engine.recommend(1, 50, Weights::default(), 0.5).await.unwrap();
        let blocked: BlockSet = block.into_iter().collect();

        assert!(result.ids().iter().all(|id| !blocked.contains(id)));
        assert!(result.ids().contains(&ItemId(501)));
    }

    #[tokio::test]
    async fn test_library_failure_is_fatal() {
        let mut store = MockUserLibraryStore::new();
        store
            .expect_favorites()
            .returning(|_| Err(SourceError::Upstream("db down".to_string())));
        store.expect_ratings().returning(|_| Ok(BTreeMap::new()));
        store.expect_hidden().returning(|_| Ok(BTreeSet::new()));

        let engine = RecommendationEngine::new(
            collaborators(store, social(vec![]), similar(&[]), trending(&[]), metadata()),
            test_config(),
        );

        let result = engine.recommend(1, 24, Weights::default(), 0.3).await;
        assert!(matches!(result, Err(AppError::ProfileStore(_))));
    }

    #[tokio::test]
    async fn test_failing_sources_degrade_to_no_candidates() {
        let mut feed = MockTrendingFeed::new();
        feed.expect_trending()
            .returning(|_| Err(SourceError::Upstream("502".to_string())));
        let mut similarity = MockSimilarityService::new();
        similarity
            .expect_similar_items()
            .returning(|_, _| Err(SourceError::Upstream("502".to_string())));
        let mut social_store = MockSocialSignalStore::new();
        social_store
            .expect_edges_for()
            .returning(|_| Err(SourceError::Upstream("pool closed".to_string())));

        let engine = RecommendationEngine::new(
            collaborators(library(&[1, 2, 3], &[]), social_store, similarity, feed, metadata()),
            test_config(),
        );

        let result = engine.recommend(1, 24, Weights::default(), 0.3).await.unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.reason, Some(EmptyReason::NoCandidates));
    }

    struct SlowTrending;

    #[async_trait::async_trait]
    impl TrendingFeed for SlowTrending {
        async fn trending(&self, _window: TrendingWindow) -> SourceResult<Vec<TrendingItem>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_slow_generator_times_out_without_failing_request() {
        let config = RecommendConfig {
            generator_timeout: Duration::from_millis(20),
            ..test_config()
        };
        let engine = RecommendationEngine::new(
            collaborators(
                library(&[100, 101, 102], &[]),
                social(vec![edge(100, 500, 5.0)]),
                similar(&[]),
                SlowTrending,
                metadata(),
            ),
            config,
        );

        let result = engine.recommend(1, 24, Weights::default(), 0.3).await.unwrap();
        assert_eq!(result.ids(), vec![ItemId(500)]);
        assert_eq!(result.meta.sources.trending, 0);
    }

    struct SlowLibrary;

    #[async_trait::async_trait]
    impl UserLibraryStore for SlowLibrary {
        async fn favorites(&self, _user_id: UserId) -> SourceResult<BTreeSet<ItemId>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(BTreeSet::new())
        }

        async fn ratings(&self, _user_id: UserId) -> SourceResult<BTreeMap<ItemId, f64>> {
            Ok(BTreeMap::new())
        }

        async fn hidden(&self, _user_id: UserId) -> SourceResult<BTreeSet<ItemId>> {
            Ok(BTreeSet::new())
        }
    }

    #[tokio::test]
    async fn test_request_deadline_cancels() {
        let config = RecommendConfig {
            request_timeout: Duration::from_millis(20),
            ..test_config()
        };
        let engine = RecommendationEngine::new(
            collaborators(SlowLibrary, social(vec![]), similar(&[]), trending(&[]), metadata()),
            config,
        );

        let result = engine.recommend(1, 24, Weights::default(), 0.3).await;
        assert!(matches!(result, Err(AppError::Cancelled(_))));

        let explained = engine.explain(1, ItemId(5)).await;
        assert!(matches!(explained, Err(AppError::Cancelled(_))));
    }

    #[derive(Default)]
    struct MemoryResultCache {
        entries: Mutex<HashMap<String, RecommendationResult>>,
    }

    #[async_trait::async_trait]
    impl ResultCache for MemoryResultCache {
        async fn get(&self, key: &str) -> Option<RecommendationResult> {
            self.entries.lock().unwrap().get(key).cloned()
        }

        fn put(&self, key: &str, result: &RecommendationResult, _ttl_secs: u64) {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), result.clone());
        }
    }

    #[tokio::test]
    async fn test_identical_request_served_from_result_cache() {
        let mut social_store = MockSocialSignalStore::new();
        social_store
            .expect_edges_for()
            .times(1)
            .returning(|_| Ok(vec![edge(100, 500, 5.0)]));

        let cache = Arc::new(MemoryResultCache::default());
        let engine = RecommendationEngine::new(
            collaborators(
                library(&[100, 101, 102], &[]),
                social_store,
                similar(&[]),
                trending(&[]),
                metadata(),
            ),
            RecommendConfig::default(),
        )
        .with_result_cache(cache.clone());

        let first = engine.recommend(1, 24, Weights::default(), 0.3).await.unwrap();
        let second = engine.recommend(1, 24, Weights::default(), 0.3).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.entries.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cache_key_tracks_snapshot() {
        let base = LibrarySnapshot {
            favorites: set(&[1, 2, 3]),
            ..Default::default()
        };
        let mut hidden_changed = base.clone();
        hidden_changed.hidden.insert(ItemId(9));

        let w = Weights::default();
        let key = result_cache_key(1, 24, &w, 0.3, &base, 7.0);

        assert_eq!(key, result_cache_key(1, 24, &w, 0.3, &base, 7.0));
        assert_ne!(key, result_cache_key(1, 24, &w, 0.3, &hidden_changed, 7.0));
        assert_ne!(key, result_cache_key(2, 24, &w, 0.3, &base, 7.0));
        assert_ne!(key, result_cache_key(1, 12, &w, 0.3, &base, 7.0));
        assert_ne!(key, result_cache_key(1, 24, &w, 0.9, &base, 7.0));
    }

    #[test]
    fn test_cache_key_keeps_full_precision() {
        let base = LibrarySnapshot {
            favorites: set(&[1, 2, 3]),
            ..Default::default()
        };
        let w = Weights::default();
        let nudged = Weights {
            social: w.social + 1e-7,
            ..w
        };

        let key = result_cache_key(1, 24, &w, 0.3, &base, 7.0);
        assert_ne!(key, result_cache_key(1, 24, &w, 0.30001, &base, 7.0));
        assert_ne!(key, result_cache_key(1, 24, &w, 0.3 + 1e-9, &base, 7.0));
        assert_ne!(key, result_cache_key(1, 24, &nudged, 0.3, &base, 7.0));
    }

    #[tokio::test]
    async fn test_explain_uses_favorites_as_anchors() {
        let engine = standard_engine(&[100, 101, 102], &[]);

        let first = engine.explain(1, ItemId(500)).await.unwrap();
        let second = engine.explain(1, ItemId(500)).await.unwrap();

        assert_eq!(first.target_id, ItemId(500));
        assert!(!first.anchors.is_empty());
        assert_eq!(first.anchors[0].id, ItemId(100));
        assert_eq!(first, second);
    }
}
