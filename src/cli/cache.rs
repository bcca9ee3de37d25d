use super::ui;
use crate::core::config::AppConfig;
use crate::store::open_cache_store;
use anyhow::Result;
use tracing::info;

/// Removes expired enrichment results from the configured cache.
pub async fn purge(config: &AppConfig) -> Result<()> {
    let store = open_cache_store(config)?;
    let removed = store.purge_expired().await;
    info!(removed, "Purged expired cache entries");
    println!(
        "{}",
        ui::style_text(
            &format!("Removed {removed} expired cache entries"),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
