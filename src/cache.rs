// =============================================================================
// COMPOSED PAGE CACHE
// =============================================================================
// Composed pages are cached in Redis under `page:{id}:{view}` for a short
// TTL and dropped whenever the page or one of its sections changes.
//
// The cache is best effort: a Redis failure is logged and the request falls
// through to the database.
// =============================================================================

use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Instant;

use crate::metrics;
use crate::models::ComposedPage;

#[derive(Clone)]
pub struct PageCache {
    redis: ConnectionManager,
    ttl_secs: u64,
}

/// Cache key for a page rendering; hidden sections are a separate view
pub fn page_key(page_id: &str, include_hidden: bool) -> String {
    let view = if include_hidden { "all" } else { "visible" };
    format!("page:{page_id}:{view}")
}

impl PageCache {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn get(&self, page_id: &str, include_hidden: bool) -> Option<ComposedPage> {
        let started = Instant::now();
        let result: redis::RedisResult<Option<String>> =
            self.redis.clone().get(page_key(page_id, include_hidden)).await;
        metrics::record_redis_operation("get", started.elapsed().as_secs_f64());

        match result {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(page) => {
                    tracing::debug!(page_id, "Composed page cache hit");
                    Some(page)
                }
                Err(e) => {
                    tracing::warn!(page_id, error = %e, "Discarding unreadable cached page");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(page_id, error = %e, "Page cache read failed");
                None
            }
        }
    }

    pub async fn put(&self, page_id: &str, include_hidden: bool, page: &ComposedPage) {
        if self.ttl_secs == 0 {
            return;
        }
        let payload = match serde_json::to_string(page) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(page_id, error = %e, "Composed page not cacheable");
                return;
            }
        };

        let started = Instant::now();
        let result = redis::cmd("SET")
            .arg(page_key(page_id, include_hidden))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut self.redis.clone())
            .await;
        metrics::record_redis_operation("set", started.elapsed().as_secs_f64());

        if let Err(e) = result {
            tracing::warn!(page_id, error = %e, "Page cache write failed");
        }
    }

    /// Drop both views of a page
    pub async fn invalidate(&self, page_id: &str) {
        let started = Instant::now();
        let result: redis::RedisResult<u64> = self
            .redis
            .clone()
            .del(&[page_key(page_id, true), page_key(page_id, false)])
            .await;
        metrics::record_redis_operation("delete", started.elapsed().as_secs_f64());

        if let Err(e) = result {
            tracing::warn!(page_id, error = %e, "Page cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_keys() {
        assert_eq!(page_key("12", true), "page:12:all");
        assert_eq!(page_key("12", false), "page:12:visible");
    }

    #[test]
    fn test_padded_page_id_shares_the_canonical_key() {
        let padded = crate::ids::canonical_id("012").unwrap();
        assert_eq!(page_key(&padded, true), page_key("12", true));
    }
}
