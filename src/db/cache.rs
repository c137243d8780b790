use crate::models::RecommendationResult;

use super::{Cache, CacheKey};

/// Short-lived store of finished recommendation results
///
/// Keys are built by the engine and already encode the library snapshot, so
/// implementations only need plain get/put. Lookups never fail: an unreadable
/// cache is a miss.
#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<RecommendationResult>;

    fn put(&self, key: &str, result: &RecommendationResult, ttl_secs: u64);
}

#[async_trait::async_trait]
impl ResultCache for Cache {
    async fn get(&self, key: &str) -> Option<RecommendationResult> {
        match self
            .get_from_cache(&CacheKey::Recommendation(key.to_string()))
            .await
        {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation cache read failed");
                None
            }
        }
    }

    fn put(&self, key: &str, result: &RecommendationResult, ttl_secs: u64) {
        self.set_in_background(&CacheKey::Recommendation(key.to_string()), result, ttl_secs);
    }
}
