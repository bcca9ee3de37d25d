use crate::core::cache::{CacheEntry, CacheKey, CacheStore};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const PARTITION: &str = "enrichment";

/// Cache store backed by a fjall partition so entries survive restarts.
///
/// Values are JSON encoded [`CacheEntry`] records keyed by the cache key string.
pub struct FjallCacheStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    // Serializes read-compare-write so the newest timestamp always wins.
    write_lock: Mutex<()>,
}

impl FjallCacheStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)?;

        let keyspace = Config::new(db_path.join("fjall_db")).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            partition,
            write_lock: Mutex::new(()),
        })
    }

    fn read_entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        match self.partition.get(key.as_str())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CacheStore for FjallCacheStore {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        match self.read_entry(key) {
            Ok(Some(entry)) => {
                if entry.is_expired_at(Utc::now()) {
                    debug!("Cache entry expired for key: {}", key);
                    return None;
                }
                debug!("Cache HIT for key: {}", key);
                Some(entry.value)
            }
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                None
            }
            Err(e) => {
                debug!("FjallCacheStore get error: {}", e);
                None
            }
        }
    }

    async fn put_entry(&self, key: CacheKey, entry: CacheEntry) {
        let _guard = self.write_lock.lock().await;
        let res: Result<()> = (|| {
            if let Some(existing) = self.read_entry(&key)? {
                if !entry.supersedes(&existing) {
                    debug!("Cache PUT skipped for key: {} (newer entry present)", key);
                    return Ok(());
                }
            }
            self.partition
                .insert(key.as_str(), serde_json::to_vec(&entry)?)?;
            self.keyspace.persist(PersistMode::Buffer)?;
            debug!("Cache PUT for key: {}", key);
            Ok(())
        })();
        if let Err(e) = res {
            debug!("FjallCacheStore put error: {}", e);
        }
    }

    async fn purge_expired(&self) -> usize {
        let _guard = self.write_lock.lock().await;
        let now = Utc::now();
        let res: Result<usize> = (|| {
            let mut expired = Vec::new();
            for kv in self.partition.iter() {
                let (key, value) = kv?;
                let entry: CacheEntry = serde_json::from_slice(&value)?;
                if entry.is_expired_at(now) {
                    expired.push(key);
                }
            }
            for key in &expired {
                self.partition.remove(key.clone())?;
            }
            self.keyspace.persist(PersistMode::Buffer)?;
            Ok(expired.len())
        })();

        match res {
            Ok(removed) => {
                debug!("Cache PURGE removed {} entries", removed);
                removed
            }
            Err(e) => {
                debug!("FjallCacheStore purge error: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::Stage;
    use std::time::Duration;
    use tempfile::tempdir;

    fn key(identity: &str) -> CacheKey {
        CacheKey::derive(Stage::Summary, "v1", identity)
    }

    #[tokio::test]
    async fn test_fjall_cache_get_put() {
        let dir = tempdir().unwrap();
        let cache = FjallCacheStore::open(dir.path()).unwrap();

        // Initially, cache is empty
        assert!(cache.get(&key("a")).await.is_none());

        cache
            .put(key("a"), "summary".to_string(), Duration::from_secs(60))
            .await;

        assert_eq!(cache.get(&key("a")).await, Some("summary".to_string()));
        assert!(cache.get(&key("b")).await.is_none());
    }

    #[tokio::test]
    async fn test_fjall_entry_older_than_ttl_reads_absent() {
        let dir = tempdir().unwrap();
        let cache = FjallCacheStore::open(dir.path()).unwrap();
        let entry = CacheEntry {
            value: "stale".to_string(),
            created_at: Utc::now() - chrono::Duration::hours(2),
            ttl: Duration::from_secs(3600),
        };
        cache.put_entry(key("a"), entry).await;

        assert!(cache.get(&key("a")).await.is_none());
    }

    #[tokio::test]
    async fn test_fjall_newest_timestamp_wins() {
        let dir = tempdir().unwrap();
        let cache = FjallCacheStore::open(dir.path()).unwrap();
        let newer = CacheEntry::new("newer".to_string(), Duration::from_secs(60));
        let older = CacheEntry {
            value: "older".to_string(),
            created_at: newer.created_at - chrono::Duration::seconds(5),
            ttl: Duration::from_secs(60),
        };

        cache.put_entry(key("a"), newer).await;
        cache.put_entry(key("a"), older).await;

        assert_eq!(cache.get(&key("a")).await, Some("newer".to_string()));
    }

    #[tokio::test]
    async fn test_fjall_entries_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let cache = FjallCacheStore::open(dir.path()).unwrap();
            cache
                .put(key("a"), "summary".to_string(), Duration::from_secs(3600))
                .await;
        }

        let reopened = FjallCacheStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(&key("a")).await, Some("summary".to_string()));
    }

    #[tokio::test]
    async fn test_fjall_purge_expired() {
        let dir = tempdir().unwrap();
        let cache = FjallCacheStore::open(dir.path()).unwrap();
        cache
            .put(key("fresh"), "v".to_string(), Duration::from_secs(60))
            .await;
        cache
            .put_entry(
                key("stale"),
                CacheEntry {
                    value: "v".to_string(),
                    created_at: Utc::now() - chrono::Duration::minutes(5),
                    ttl: Duration::from_secs(60),
                },
            )
            .await;

        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.get(&key("fresh")).await.is_some());
        assert_eq!(cache.purge_expired().await, 0);
    }
}
