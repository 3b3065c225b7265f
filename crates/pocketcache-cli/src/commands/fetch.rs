use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;

use pocketcache_core::fetch::{DataSource, FetchRequest, UseFetch};
use pocketcache_core::utils::format_age;
use pocketcache_core::Config;

use crate::cli::CacheAction;

pub async fn run(
    config: &Config,
    url: String,
    key: Option<String>,
    min_latency_ms: Option<u64>,
    refresh: bool,
) -> Result<()> {
    let fetcher = config.fetcher()?;

    let mut request = FetchRequest::new(url);
    if let Some(key) = key {
        request = request.with_cache_key(key);
    }
    if let Some(min_latency) = min_latency_ms
        .map(Duration::from_millis)
        .or_else(|| config.default_min_latency())
    {
        request = request.with_min_latency(min_latency);
    }

    if refresh {
        if let Some(key) = request.cache_key() {
            fetcher.invalidate(key)?;
        }
    }

    let mut hook: UseFetch<Value> = UseFetch::new(fetcher);
    hook.set_request(request);
    eprintln!("Loading...");
    let state = hook.settled().await;

    if let Some(error) = state.error {
        anyhow::bail!("{}", error);
    }

    match state.source {
        Some(DataSource::Cache) => {
            let age = state
                .cached_at
                .map(|at| format_age((Utc::now() - at).num_minutes()))
                .unwrap_or_else(|| "unknown age".to_string());
            eprintln!("Served from cache ({})", age);
        }
        Some(DataSource::Network) => eprintln!("Fetched from network"),
        None => eprintln!("Nothing to fetch"),
    }

    if let Some(data) = state.data {
        println!("{}", serde_json::to_string_pretty(&data)?);
    }
    Ok(())
}

pub fn cache(config: &Config, action: CacheAction) -> Result<()> {
    let fetcher = config.fetcher()?;
    let cache = fetcher.cache();

    match action {
        CacheAction::List => {
            let keys = cache.keys()?;
            if keys.is_empty() {
                println!("Cache is empty");
            }
            for key in keys {
                match cache.load::<Value>(&key) {
                    Ok(Some(entry)) => println!("{:<40} {}", key, entry.age_display()),
                    Ok(None) => {}
                    Err(_) => println!("{:<40} unreadable", key),
                }
            }
        }
        CacheAction::Remove { key } => {
            fetcher.invalidate(&key)?;
            println!("Removed {}", key);
        }
        CacheAction::Clear { all } => {
            if all {
                cache.clear_all()?;
                println!("Cleared the entire cache store");
            } else {
                let removed = fetcher.clear_cache()?;
                println!("Removed {} cached responses", removed);
            }
        }
    }
    Ok(())
}
