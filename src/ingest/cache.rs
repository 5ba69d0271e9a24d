//! Short-TTL cache for pull-path responses

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
    stored_at: Instant,
    ttl: Duration,
    value: serde_json::Value,
}

/// In-memory cache with per-entry TTL
///
/// A hit short-circuits the rate limiter and circuit breaker entirely, so
/// entries are kept deliberately short-lived (tens of seconds for quotes).
pub struct QuoteCache {
    default_ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl QuoteCache {
    /// Create a cache with the given default TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a live entry, pruning it if expired
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.stored_at.elapsed() < entry.ttl => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but expired; drop it
        self.entries.write().await.remove(key);
        None
    }

    /// Store a value under the default TTL
    pub async fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL
    pub async fn set_with_ttl(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        ttl: Duration,
    ) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            Entry {
                stored_at: Instant::now(),
                ttl,
                value,
            },
        );
    }

    /// Number of entries currently stored (live or expired)
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
