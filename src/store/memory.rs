use crate::core::cache::{CacheEntry, CacheKey, CacheStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory cache store using a HashMap behind an async Mutex
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<Mutex<HashMap<CacheKey, CacheEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        let cache = self.inner.lock().await;
        if let Some(entry) = cache.get(key) {
            if entry.is_expired_at(Utc::now()) {
                debug!("Cache entry expired for key: {}", key);
                return None;
            }
            debug!("Cache HIT for key: {}", key);
            return Some(entry.value.clone());
        }
        debug!("Cache MISS for key: {}", key);
        None
    }

    async fn put_entry(&self, key: CacheKey, entry: CacheEntry) {
        let mut cache = self.inner.lock().await;
        if let Some(existing) = cache.get(&key) {
            if !entry.supersedes(existing) {
                debug!("Cache PUT skipped for key: {} (newer entry present)", key);
                return;
            }
        }
        debug!("Cache PUT for key: {}", key);
        cache.insert(key, entry);
    }

    async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut cache = self.inner.lock().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - cache.len();
        debug!("Cache PURGE removed {} entries", removed);
        removed
    }
}
