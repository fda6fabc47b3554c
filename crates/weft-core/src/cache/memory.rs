use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::cache::CacheProvider;

/// In-process cache backend.
///
/// Expiry is checked lazily on read; `keys` sweeps expired entries so a
/// long-lived process does not accumulate dead values.
pub struct MemoryCache {
    prefix: Option<String>,
    entries: RwLock<HashMap<String, Entry>>,
}

struct Entry {
    value: serde_json::Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.entries.read().map(|e| e.len()).unwrap_or(0);
        f.debug_struct("MemoryCache")
            .field("prefix", &self.prefix)
            .field("entries", &len)
            .finish()
    }
}

impl MemoryCache {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn namespaced(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn strip(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(&format!("{}:", prefix))
                .unwrap_or(key)
                .to_string(),
            None => key.to_string(),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let key = self.namespaced(key);
        let now = Instant::now();
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(&key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired entry: drop it under the write lock.
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(&key);
        None
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl_seconds: Option<u64>) {
        let key = self.namespaced(key);
        let expires_at = ttl_seconds.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        self.entries
            .write()
            .expect("cache lock poisoned")
            .insert(key, Entry { value, expires_at });
    }

    async fn del(&self, key: &str) -> bool {
        let key = self.namespaced(key);
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(&key)
            .is_some()
    }

    async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.keys().map(|k| self.strip(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = MemoryCache::new(None);
        cache.set("answer", json!(42), None).await;
        assert_eq!(cache.get("answer").await, Some(json!(42)));
    }

    #[tokio::test]
    async fn del_removes_and_reports() {
        let cache = MemoryCache::new(None);
        cache.set("gone", json!("soon"), None).await;
        assert!(cache.del("gone").await);
        assert!(!cache.del("gone").await);
        assert_eq!(cache.get("gone").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let cache = MemoryCache::new(None);
        cache.set("flash", json!(true), Some(0)).await;
        assert_eq!(cache.get("flash").await, None);
        assert!(cache.keys().await.is_empty());
    }

    #[tokio::test]
    async fn prefix_namespaces_but_stays_invisible() {
        let cache = MemoryCache::new(Some("app".into()));
        cache.set("key", json!(1), None).await;
        assert_eq!(cache.get("key").await, Some(json!(1)));
        assert_eq!(cache.keys().await, vec!["key".to_string()]);
    }
}
