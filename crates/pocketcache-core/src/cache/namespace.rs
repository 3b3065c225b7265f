use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::KeyValueStore;
use crate::utils::format_age;

/// Separator between namespace and caller key in the underlying store
const NAMESPACE_SEPARATOR: char = ':';

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }
}

/// A key-prefix partition of a shared `KeyValueStore`.
///
/// Clone is cheap and clones share the same backing store.
#[derive(Clone)]
pub struct CacheNamespace {
    store: Arc<dyn KeyValueStore>,
    name: String,
    prefix: String,
}

impl CacheNamespace {
    /// The separator is escaped inside `name`, so `news` and `news:eu` get
    /// disjoint prefixes.
    pub fn new(store: Arc<dyn KeyValueStore>, name: &str) -> Self {
        let escaped = name.replace('%', "%25").replace(NAMESPACE_SEPARATOR, "%3A");
        Self {
            store,
            name: name.to_string(),
            prefix: format!("{}{}", escaped, NAMESPACE_SEPARATOR),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedData<T>>> {
        let Some(contents) = self.store.get(&self.full_key(key))? else {
            return Ok(None);
        };

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", key))?;

        Ok(Some(cached))
    }

    pub fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string(&cached)?;
        self.store.set(&self.full_key(key), &contents)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.full_key(key))
    }

    /// Keys in this namespace, without the prefix.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    /// Remove every entry in this namespace, leaving other namespaces alone.
    pub fn clear(&self) -> Result<usize> {
        let keys = self.keys()?;
        for key in &keys {
            self.remove(key)?;
        }
        debug!(namespace = self.name(), removed = keys.len(), "Cleared cache namespace");
        Ok(keys.len())
    }

    /// Wipe the whole backing store, including other namespaces.
    pub fn clear_all(&self) -> Result<()> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn shared_store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_save_and_load() {
        let cache = CacheNamespace::new(shared_store(), "fetch");
        cache.save("users", &vec!["ada", "grace"]).unwrap();

        let loaded: CachedData<Vec<String>> = cache.load("users").unwrap().unwrap();
        assert_eq!(loaded.data, vec!["ada", "grace"]);
        assert!(cache.load::<Vec<String>>("other").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let store = shared_store();
        store.set("fetch:users", "not json").unwrap();
        let cache = CacheNamespace::new(store, "fetch");
        assert!(cache.load::<Vec<String>>("users").is_err());
    }

    #[test]
    fn test_clear_is_scoped_to_namespace() {
        let store = shared_store();
        let news = CacheNamespace::new(store.clone(), "news");
        let weather = CacheNamespace::new(store.clone(), "weather");

        news.save("page_1", &1).unwrap();
        news.save("page_2", &2).unwrap();
        weather.save("today", &"sunny").unwrap();

        assert_eq!(news.clear().unwrap(), 2);
        assert!(news.keys().unwrap().is_empty());
        assert_eq!(weather.keys().unwrap(), vec!["today".to_string()]);
    }

    #[test]
    fn test_separator_in_name_does_not_overlap() {
        let store = shared_store();
        let news = CacheNamespace::new(store.clone(), "news");
        let news_eu = CacheNamespace::new(store.clone(), "news:eu");
        assert_eq!(news_eu.name(), "news:eu");

        news.save("page_1", &1).unwrap();
        news_eu.save("page_1", &2).unwrap();

        assert_eq!(news.keys().unwrap(), vec!["page_1".to_string()]);
        assert_eq!(news.clear().unwrap(), 1);
        let kept: CachedData<i32> = news_eu.load("page_1").unwrap().unwrap();
        assert_eq!(kept.data, 2);
    }

    #[test]
    fn test_clear_all_wipes_everything() {
        let store = shared_store();
        let news = CacheNamespace::new(store.clone(), "news");
        let weather = CacheNamespace::new(store.clone(), "weather");
        news.save("page_1", &1).unwrap();
        weather.save("today", &2).unwrap();

        news.clear_all().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
