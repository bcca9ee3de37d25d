pub mod feeds;
pub mod openai;
pub mod yahoo_finance;

use crate::core::config::{AppConfig, EnrichmentConfig};
use anyhow::{Context, Result};
use feeds::RssFeedFetcher;
use openai::OpenAiBackend;
use yahoo_finance::YahooPriceProvider;

pub fn price_provider(config: &AppConfig) -> Result<YahooPriceProvider> {
    YahooPriceProvider::new(
        &config.providers.yahoo.base_url,
        config.briefing.fetch_timeout(),
        config.enrichment.retry_policy(),
        config.briefing.flat_threshold_percent,
    )
}

pub fn feed_fetcher(config: &AppConfig) -> Result<RssFeedFetcher> {
    RssFeedFetcher::new(
        &config.providers,
        config.briefing.fetch_timeout(),
        config.briefing.max_items_per_source,
    )
}

/// Completion backend with the API key read from `api_key_env`.
pub fn completion_backend(config: &EnrichmentConfig) -> Result<OpenAiBackend> {
    let api_key = std::env::var(&config.api_key_env).with_context(|| {
        format!(
            "Environment variable {} with the enrichment API key is not set",
            config.api_key_env
        )
    })?;
    OpenAiBackend::new(&config.base_url, &config.model, &api_key)
}
