//! TMDb API provider
//!
//! Backs three collaborators with one HTTP client:
//! 1. Similarity: /tv/{id}/similar → related show ids
//! 2. Trending: /trending/tv/{day|week} → global feed with language, genres, popularity
//! 3. Metadata: /tv/{id} → title, genres, language, vote statistics
//!
//! Responses go through the Redis read-through cache; a cache outage only
//! costs an extra API call.

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{SourceError, SourceResult},
    models::{
        ItemId, ItemMetadata, TmdbPage, TmdbShowDetails, TmdbShowSummary, TrendingItem,
        TrendingWindow,
    },
    services::providers::{MetadataProvider, SimilarityService, TrendingFeed},
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::instrument;

const SIMILAR_CACHE_TTL: u64 = 3600; // 1 hour
const TRENDING_CACHE_TTL: u64 = 600; // 10 minutes
const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> anyhow::Result<Self> {
        let http_client = HttpClient::builder().timeout(HTTP_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SourceResult<T> {
        let response = self
            .http_client
            .get(self.url(path))
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Upstream(format!(
                "TMDb API returned status {} for {}: {}",
                status, path, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl SimilarityService for TmdbProvider {
    #[instrument(level = "debug", skip(self), fields(provider = "tmdb"))]
    async fn similar_items(&self, id: ItemId, max_results: usize) -> SourceResult<Vec<ItemId>> {
        cached!(
            self.cache,
            CacheKey::Similar { id, max_results },
            SIMILAR_CACHE_TTL,
            async move {
                let page: TmdbPage<TmdbShowSummary> =
                    self.get_json(&format!("/tv/{}/similar", id)).await?;

                let ids: Vec<ItemId> = page
                    .results
                    .into_iter()
                    .map(|show| ItemId(show.id))
                    .filter(|similar| *similar != id)
                    .take(max_results)
                    .collect();

                tracing::debug!(results = ids.len(), "Similar shows fetched");

                Ok::<_, SourceError>(ids)
            }
        )
    }
}

#[async_trait::async_trait]
impl TrendingFeed for TmdbProvider {
    #[instrument(level = "debug", skip(self), fields(provider = "tmdb"))]
    async fn trending(&self, window: TrendingWindow) -> SourceResult<Vec<TrendingItem>> {
        cached!(
            self.cache,
            CacheKey::Trending(window),
            TRENDING_CACHE_TTL,
            async move {
                let page: TmdbPage<TmdbShowSummary> =
                    self.get_json(&format!("/trending/tv/{}", window)).await?;

                let items: Vec<TrendingItem> =
                    page.results.into_iter().map(TrendingItem::from).collect();

                tracing::info!(results = items.len(), "Trending feed fetched");

                Ok::<_, SourceError>(items)
            }
        )
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    #[instrument(level = "debug", skip(self), fields(provider = "tmdb"))]
    async fn details(&self, id: ItemId) -> SourceResult<ItemMetadata> {
        cached!(
            self.cache,
            CacheKey::Details(id),
            DETAILS_CACHE_TTL,
            async move {
                let details: TmdbShowDetails = self.get_json(&format!("/tv/{}", id)).await?;
                Ok::<_, SourceError>(ItemMetadata::from(details))
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    /// Records the name and fields of every span opened while installed
    #[derive(Clone, Default)]
    struct SpanRecorder(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for SpanRecorder {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let fields: Vec<&str> = attrs.metadata().fields().iter().map(|f| f.name()).collect();
            self.0
                .lock()
                .unwrap()
                .push(format!("{}[{}]", attrs.metadata().name(), fields.join(",")));
        }
    }

    fn create_test_provider() -> TmdbProvider {
        let client = redis::Client::open("redis://localhost:6379").unwrap();
        let (cache, _handle) = Cache::new(client);
        TmdbProvider::new(
            cache,
            "test_key".to_string(),
            "http://test.local/3/".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_url_joins_without_double_slash() {
        let provider = create_test_provider();
        assert_eq!(provider.url("/tv/1396"), "http://test.local/3/tv/1396");
    }

    #[tokio::test]
    async fn test_details_runs_in_provider_span() {
        let recorder = SpanRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        // Neither Redis nor the API is reachable, so the lookup fails fast
        let client = redis::Client::open("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);
        let provider =
            TmdbProvider::new(cache, "test_key".to_string(), "http://127.0.0.1:1/3".to_string())
                .unwrap();

        assert!(provider.details(ItemId(1396)).await.is_err());

        let spans = recorder.0.lock().unwrap().clone();
        let span = spans.iter().find(|s| s.starts_with("details[")).unwrap();
        assert!(span.contains("id") && span.contains("provider"));
    }

    #[test]
    fn test_similar_page_deserialization() {
        let json = r#"{
            "page": 1,
            "results": [
                {"id": 60059, "name": "Better Call Saul", "original_language": "en", "genre_ids": [80, 18], "popularity": 120.1},
                {"id": 1396, "name": "Breaking Bad"}
            ],
            "total_pages": 1
        }"#;

        let page: TmdbPage<TmdbShowSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].id, 60059);
        assert_eq!(page.results[0].genre_ids, vec![80, 18]);
        assert_eq!(page.results[1].popularity, None);
    }
}
