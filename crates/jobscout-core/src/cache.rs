//! Short-lived response cache used to collapse bursts of identical requests.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::fetch::StrategyKind;

/// Cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10),
            max_entries: 1_000,
        }
    }
}

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub html: String,
    pub status: u16,
    pub strategy: StrategyKind,
}

/// URL-keyed page cache with a fixed time-to-live.
///
/// Clones share the same underlying store.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, CachedPage>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { inner }
    }

    pub async fn get(&self, url: &str) -> Option<CachedPage> {
        self.inner.get(url).await
    }

    pub async fn put(&self, url: &str, html: String, status: u16, strategy: StrategyKind) {
        self.inner
            .insert(
                url.to_string(),
                CachedPage {
                    html,
                    status,
                    strategy,
                },
            )
            .await;
    }

    /// Return the cached page or run `fetch` to produce it.
    ///
    /// Concurrent callers for the same URL share a single `fetch`; errors
    /// are handed to every waiter and nothing is cached.
    pub async fn get_or_fetch<F, E>(&self, url: &str, fetch: F) -> Result<CachedPage, Arc<E>>
    where
        F: Future<Output = Result<CachedPage, E>>,
        E: Send + Sync + 'static,
    {
        self.inner.try_get_with(url.to_string(), fetch).await
    }

    /// Approximate number of live entries.
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn page(html: &str) -> CachedPage {
        CachedPage {
            html: html.to_string(),
            status: 200,
            strategy: StrategyKind::Direct,
        }
    }

    #[tokio::test]
    async fn put_then_get() {
        let cache = ResponseCache::new(&CacheConfig::default());
        cache
            .put("https://example.com/a", "<html>a</html>".into(), 200, StrategyKind::Proxy)
            .await;

        let hit = cache.get("https://example.com/a").await.unwrap();
        assert_eq!(hit.html, "<html>a</html>");
        assert_eq!(hit.strategy, StrategyKind::Proxy);
        assert!(cache.get("https://example.com/b").await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(&CacheConfig {
            ttl: Duration::from_millis(50),
            max_entries: 10,
        });
        cache
            .put("https://example.com", "<html/>".into(), 200, StrategyKind::Direct)
            .await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("https://example.com").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_fetches_are_collapsed() {
        let cache = ResponseCache::new(&CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok::<_, String>(page("<html>shared</html>"))
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch("https://example.com/job", fetch()),
            cache.get_or_fetch("https://example.com/job", fetch()),
        );

        assert_eq!(a.unwrap().html, "<html>shared</html>");
        assert_eq!(b.unwrap().html, "<html>shared</html>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = ResponseCache::new(&CacheConfig::default());
        let err = cache
            .get_or_fetch("https://example.com", async { Err::<CachedPage, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(*err, "boom");
        assert!(cache.get("https://example.com").await.is_none());
    }
}
