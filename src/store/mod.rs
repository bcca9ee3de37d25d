pub mod disk;
pub mod memory;

use crate::core::cache::CacheStore;
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use disk::FjallCacheStore;
use memory::MemoryCacheStore;
use std::sync::Arc;
use tracing::debug;

/// Opens the configured cache backend. Persistent caches live under
/// `{data_path}/cache`.
pub fn open_cache_store(config: &AppConfig) -> Result<Arc<dyn CacheStore>> {
    if !config.cache.persist {
        debug!("Using in-memory enrichment cache");
        return Ok(Arc::new(MemoryCacheStore::new()));
    }

    let cache_dir = config.default_data_path()?.join("cache");
    debug!("Opening enrichment cache at {:?}", cache_dir);
    let store = FjallCacheStore::open(&cache_dir)
        .with_context(|| format!("Failed to open cache at {}", cache_dir.display()))?;
    Ok(Arc::new(store))
}
