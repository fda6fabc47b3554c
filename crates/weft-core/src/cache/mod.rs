//! Shared async key/value cache.
//!
//! Services receive the cache through their parameter bundle. The backend is
//! selected by the `CACHE_PROVIDER` config key; `memory` is the only built-in
//! provider, and [`CacheProvider`] is the seam for wiring an external store.

pub mod memory;

use async_trait::async_trait;

pub use memory::MemoryCache;

/// Async key/value store with per-entry TTL.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug {
    /// Provider name, matched against the `CACHE_PROVIDER` config value.
    fn name(&self) -> &'static str;

    /// Fetch a value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store a value. A `ttl_seconds` of `None` means the entry never expires.
    async fn set(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>);

    /// Delete a value. Returns whether an entry was removed.
    async fn del(&self, key: &str) -> bool;

    /// List the currently live keys.
    async fn keys(&self) -> Vec<String>;
}

/// Build the provider named by the `CACHE_PROVIDER` config value.
///
/// Unknown names fall back to the memory provider with a warning so a typo in
/// configuration degrades service rather than failing bootstrap.
pub fn provider_for(name: &str, prefix: Option<String>) -> std::sync::Arc<dyn CacheProvider> {
    match name {
        "memory" => std::sync::Arc::new(MemoryCache::new(prefix)),
        other => {
            log::warn!(
                "unknown cache provider '{}', falling back to memory",
                other
            );
            std::sync::Arc::new(MemoryCache::new(prefix))
        }
    }
}
