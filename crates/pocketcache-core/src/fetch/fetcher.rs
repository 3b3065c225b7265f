use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::api::{FetchError, HttpClient};
use crate::cache::CacheNamespace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Floor on how long a network fetch appears to take. Responses that
    /// arrive sooner are held back; slower responses are not delayed.
    pub min_latency: Option<Duration>,
}

/// Inputs of one fetch. Compared by value to decide whether to refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub cache_key: Option<String>,
    pub options: FetchOptions,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_key: None,
            options: FetchOptions::default(),
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_min_latency(mut self, min_latency: Duration) -> Self {
        self.options.min_latency = Some(min_latency);
        self
    }

    /// The cache key, unless absent or blank.
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
    /// When the served entry was written, for cache hits.
    pub cached_at: Option<DateTime<Utc>>,
}

/// Fetches JSON through a cache-first policy.
///
/// A present cache entry is always served without touching the network,
/// however old it is. Cache read and write failures are logged and never
/// returned; only network and parse failures are.
#[derive(Clone)]
pub struct CachedFetcher {
    http: HttpClient,
    cache: CacheNamespace,
}

impl CachedFetcher {
    pub fn new(http: HttpClient, cache: CacheNamespace) -> Self {
        Self { http, cache }
    }

    pub fn cache(&self) -> &CacheNamespace {
        &self.cache
    }

    /// Run one fetch. Returns `Ok(None)` without any I/O when the URL is blank.
    pub async fn fetch<T>(&self, request: &FetchRequest) -> Result<Option<Fetched<T>>, FetchError>
    where
        T: DeserializeOwned + Serialize,
    {
        let url = request.url.trim();
        if url.is_empty() {
            debug!("Empty URL, skipping fetch");
            return Ok(None);
        }

        let cache_key = request.cache_key();

        if let Some(key) = cache_key {
            match self.cache.load::<T>(key) {
                Ok(Some(cached)) => {
                    debug!(key = key, age = %cached.age_display(), "Serving from cache");
                    return Ok(Some(Fetched {
                        data: cached.data,
                        source: DataSource::Cache,
                        cached_at: Some(cached.cached_at),
                    }));
                }
                Ok(None) => debug!(key = key, "Cache miss"),
                Err(e) => {
                    warn!(key = key, error = %e, "Failed to read cache entry, fetching from network");
                }
            }
        }

        let started = Instant::now();
        let result = self.http.get_json::<T>(url).await;

        if let Some(min_latency) = request.options.min_latency {
            let elapsed = started.elapsed();
            if elapsed < min_latency {
                tokio::time::sleep(min_latency - elapsed).await;
            }
        }

        let data = result?;

        if let Some(key) = cache_key {
            if let Err(e) = self.cache.save(key, &data) {
                warn!(key = key, error = %e, "Failed to cache response");
            }
        }

        Ok(Some(Fetched {
            data,
            source: DataSource::Network,
            cached_at: None,
        }))
    }

    /// Drop one cached response so the next fetch with `key` goes to the network.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        self.cache.remove(key)
    }

    /// Drop every response cached by this fetcher's namespace.
    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anyhow::anyhow;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::cache::{FileStore, KeyValueStore, MemoryStore};

    fn memory_fetcher() -> (CachedFetcher, Arc<dyn KeyValueStore>) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let fetcher = CachedFetcher::new(
            HttpClient::new().unwrap(),
            CacheNamespace::new(store.clone(), "fetch"),
        );
        (fetcher, store)
    }

    /// Store whose writes always fail, reads always miss.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow!("disk full"))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn keys(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_blank_cache_key_is_ignored() {
        let request = FetchRequest::new("http://x").with_cache_key("   ");
        assert_eq!(request.cache_key(), None);
        let request = FetchRequest::new("http://x").with_cache_key("users");
        assert_eq!(request.cache_key(), Some("users"));
    }

    #[tokio::test]
    async fn test_empty_url_issues_no_request() {
        let (fetcher, store) = memory_fetcher();
        let fetched: Option<Fetched<Value>> = fetcher
            .fetch(&FetchRequest::new("  ").with_cache_key("users"))
            .await
            .unwrap();
        assert!(fetched.is_none());
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_miss_fetches_once_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"articles": [{"title": "a"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap());
        let fetcher = CachedFetcher::new(
            HttpClient::new().unwrap(),
            CacheNamespace::new(store.clone(), "fetch"),
        );
        let request = FetchRequest::new(format!("{}/news", server.uri())).with_cache_key("news_page_1");

        let first: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert_eq!(first.source, DataSource::Network);
        assert_eq!(first.data["articles"][0]["title"], "a");
        assert_eq!(store.keys().unwrap(), vec!["fetch:news_page_1".to_string()]);

        // Second call is served from disk, the mock's expect(1) proves no request
        let second: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert_eq!(second.source, DataSource::Cache);
        assert!(second.cached_at.is_some());
        assert_eq!(second.data, first.data);
    }

    #[tokio::test]
    async fn test_hit_never_touches_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fresh": true})))
            .expect(0)
            .mount(&server)
            .await;

        let (fetcher, _store) = memory_fetcher();
        fetcher.cache().save("weather", &json!({"fresh": false})).unwrap();

        let request = FetchRequest::new(server.uri()).with_cache_key("weather");
        let fetched: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert_eq!(fetched.data, json!({"fresh": false}));
    }

    #[tokio::test]
    async fn test_without_key_always_fetches_and_never_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
            .expect(2)
            .mount(&server)
            .await;

        let (fetcher, store) = memory_fetcher();
        let request = FetchRequest::new(server.uri());
        for _ in 0..2 {
            let fetched: Fetched<Vec<u32>> = fetcher.fetch(&request).await.unwrap().unwrap();
            assert_eq!(fetched.data, vec![1, 2, 3]);
        }
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_back_to_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, store) = memory_fetcher();
        store.set("fetch:users", "{{{ definitely not json").unwrap();

        let request = FetchRequest::new(server.uri()).with_cache_key("users");
        let fetched: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert_eq!(fetched.source, DataSource::Network);

        // The bad entry was overwritten with the fresh response
        let cached = fetcher.cache().load::<Value>("users").unwrap().unwrap();
        assert_eq!(cached.data, json!({"ok": 1}));
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let fetcher = CachedFetcher::new(
            HttpClient::new().unwrap(),
            CacheNamespace::new(Arc::new(ReadOnlyStore), "fetch"),
        );
        let request = FetchRequest::new(server.uri()).with_cache_key("users");
        let fetched: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert_eq!(fetched.data, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_network_failure_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (fetcher, store) = memory_fetcher();
        let request = FetchRequest::new(server.uri()).with_cache_key("users");
        let result: Result<Option<Fetched<Value>>, _> = fetcher.fetch(&request).await;
        assert!(matches!(result, Err(FetchError::ServerError(_))));
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_min_latency_floor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (fetcher, _store) = memory_fetcher();
        let request = FetchRequest::new(server.uri()).with_min_latency(Duration::from_millis(200));

        let started = Instant::now();
        let _: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_min_latency_does_not_delay_slow_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let (fetcher, _store) = memory_fetcher();
        let request = FetchRequest::new(server.uri()).with_min_latency(Duration::from_millis(250));

        let started = Instant::now();
        let _: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        // Floor plus delay would be 550ms
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_invalidate_forces_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let (fetcher, _store) = memory_fetcher();
        fetcher.cache().save("products_1", &json!({"v": 1})).unwrap();
        fetcher.invalidate("products_1").unwrap();

        let request = FetchRequest::new(server.uri()).with_cache_key("products_1");
        let fetched: Fetched<Value> = fetcher.fetch(&request).await.unwrap().unwrap();
        assert_eq!(fetched.data, json!({"v": 2}));
    }
}
