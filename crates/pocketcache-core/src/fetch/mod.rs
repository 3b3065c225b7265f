//! Cache-first JSON fetching.
//!
//! `CachedFetcher` runs a single fetch: serve the cache entry when one
//! exists, otherwise hit the network and store the result. `UseFetch` wraps
//! it for long-lived consumers that change their request over time and
//! observe loading/data/error state through a watch channel.

pub mod fetcher;
pub mod hook;

pub use fetcher::{CachedFetcher, DataSource, FetchOptions, FetchRequest, Fetched};
pub use hook::{FetchState, UseFetch};
