//! Content-addressed cache for enrichment results.
//!
//! Keys are SHA-256 fingerprints of `(stage, prompt version, identity)`, so a
//! repeated request for the same content under the same prompt resolves to
//! the same entry, and a prompt bump invalidates everything it touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Summary,
    Sentiment,
    Overview,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Summary => "summary",
            Stage::Sentiment => "sentiment",
            Stage::Overview => "overview",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(stage: Stage, prompt_version: &str, identity: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(stage.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(prompt_version.as_bytes());
        hasher.update(b"|");
        hasher.update(identity.as_bytes());
        CacheKey(format!("{}:{}", stage, hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// An entry whose age exceeds its ttl reads as absent. Entries stamped in
    /// the future (clock skew) are treated as fresh.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match (now - self.created_at).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false,
        }
    }

    /// Last write with the newest timestamp wins.
    pub fn supersedes(&self, existing: &CacheEntry) -> bool {
        self.created_at >= existing.created_at
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<String>;

    async fn put_entry(&self, key: CacheKey, entry: CacheEntry);

    async fn put(&self, key: CacheKey, value: String, ttl: Duration) {
        self.put_entry(key, CacheEntry::new(value, ttl)).await
    }

    /// Drops expired entries and returns how many were removed.
    async fn purge_expired(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = CacheKey::derive(Stage::Summary, "v1", "https://example.com/a");
        let b = CacheKey::derive(Stage::Summary, "v1", "https://example.com/a");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("summary:"));
    }

    #[test]
    fn test_cache_key_changes_with_prompt_version_and_stage() {
        let base = CacheKey::derive(Stage::Summary, "v1", "item");
        assert_ne!(base, CacheKey::derive(Stage::Summary, "v2", "item"));
        assert_ne!(base, CacheKey::derive(Stage::Sentiment, "v1", "item"));
        assert_ne!(base, CacheKey::derive(Stage::Summary, "v1", "other item"));
    }

    #[test]
    fn test_entry_expiry() {
        let mut entry = CacheEntry::new("value".to_string(), Duration::from_secs(3600));
        assert!(!entry.is_expired_at(Utc::now()));

        entry.created_at = Utc::now() - chrono::Duration::hours(2);
        assert!(entry.is_expired_at(Utc::now()));

        entry.created_at = Utc::now() + chrono::Duration::minutes(5);
        assert!(!entry.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_newer_entry_supersedes() {
        let older = CacheEntry {
            value: "old".to_string(),
            created_at: Utc::now() - chrono::Duration::seconds(10),
            ttl: Duration::from_secs(60),
        };
        let newer = CacheEntry::new("new".to_string(), Duration::from_secs(60));
        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));
    }
}
