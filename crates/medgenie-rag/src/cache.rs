//! Caching layer for the retrieval step
//!
//! Maps the raw query text to the documents retrieved for it, so repeated
//! questions within the freshness window skip the embedding and vector
//! search round-trips. Only retrieval results are cached; generated answers
//! never are.
//!
//! Uses the moka crate for a thread-safe, async-compatible bounded cache
//! with TTL support. Eviction is LRU so a new entry is always admitted.
//!
//! Author: hephaex@gmail.com

use medgenie_core::RagConfig;
use moka::future::Cache;
use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Cache Configuration
// ============================================================================

/// Configuration for cache behavior
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of resident entries
    pub max_capacity: u64,

    /// Time-to-live of an entry, measured from insertion (in seconds)
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100,
            ttl_seconds: 300,
        }
    }
}

impl From<&RagConfig> for CacheConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            max_capacity: config.cache_max_capacity,
            ttl_seconds: config.cache_ttl_seconds,
        }
    }
}

// ============================================================================
// Query Cache
// ============================================================================

/// Cache for retrieved documents, keyed by the exact query text
///
/// Keys are not normalized: case and whitespace differences produce
/// distinct entries. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<String, Vec<String>>,
    stats: Arc<CacheStats>,
}

impl QueryCache {
    /// Cache with the default capacity (100) and TTL (300 s)
    pub fn new() -> Self {
        Self::with_config(&CacheConfig::default())
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        let stats = Arc::new(CacheStats::default());
        let listener_stats = Arc::clone(&stats);

        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_query, _docs, cause| listener_stats.record_removal(cause))
            .build();

        Self { cache, stats }
    }

    /// Get the documents cached for a query
    ///
    /// Returns `None` if the query was never stored or its TTL has elapsed.
    pub async fn get(&self, query: &str) -> Option<Vec<String>> {
        let result = self.cache.get(query).await;
        self.stats.record_lookup(result.is_some());
        result
    }

    /// Store the documents retrieved for a query
    ///
    /// Overwrites any previous entry and restarts its TTL. Capacity eviction
    /// has been applied by the time this returns.
    pub async fn put(&self, query: &str, docs: Vec<String>) {
        self.cache.insert(query.to_string(), docs).await;
        self.cache.run_pending_tasks().await;
        self.stats.record_insert();
    }

    /// Check if a live entry exists for the query
    pub fn contains(&self, query: &str) -> bool {
        self.cache.contains_key(query)
    }

    /// Drop the entry for one query
    pub async fn invalidate(&self, query: &str) {
        self.cache.invalidate(query).await;
    }

    /// Drop every entry; counters are kept
    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Number of resident entries
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Cache Statistics
// ============================================================================

/// Lookup and removal counters for the retrieval cache
///
/// Evictions and expirations are counted when moka removes the entry, which
/// for expired entries can lag behind the moment a lookup stops seeing it.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl CacheStats {
    fn record_lookup(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_removal(&self, cause: RemovalCause) {
        let counter = match cause {
            RemovalCause::Size => &self.evictions,
            RemovalCause::Expired => &self.expirations,
            // Overwrites and explicit invalidation
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Entries dropped to stay within capacity
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served from the cache (0.0 when there were none)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let lookups = hits + self.misses();
        if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        }
    }

    pub fn report(&self) -> CacheStatsReport {
        CacheStatsReport {
            hits: self.hits(),
            misses: self.misses(),
            inserts: self.inserts(),
            evictions: self.evictions(),
            expirations: self.expirations(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Point-in-time copy of [`CacheStats`] for the metrics endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsReport {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub hit_rate: f64,
}

// ============================================================================
// Tests
// ============================================================================
