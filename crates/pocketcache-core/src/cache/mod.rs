//! Local caching module for offline data access.
//!
//! This module provides the `KeyValueStore` backends (`FileStore` on disk,
//! `MemoryStore` in process) and `CacheNamespace`, a key-prefix partition
//! that stores JSON values wrapped with their cache time.
//!
//! Entries never expire. Freshness is managed by removing an entry before
//! fetching again.

pub mod namespace;
pub mod store;

pub use namespace::{CacheNamespace, CachedData};
pub use store::{FileStore, KeyValueStore, MemoryStore};
