use crate::core::retry::RetryPolicy;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Instrument {
    pub ticker: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl ProviderConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub yahoo: ProviderConfig,
    pub yahoo_rss: ProviderConfig,
    pub google_news: ProviderConfig,
    pub bing: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: ProviderConfig::new("https://query1.finance.yahoo.com"),
            yahoo_rss: ProviderConfig::new("https://feeds.finance.yahoo.com"),
            google_news: ProviderConfig::new("https://news.google.com"),
            bing: ProviderConfig::new("https://www.bing.com"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Base URL of an OpenAI compatible chat completions API
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub prompt_version: String,
    pub max_in_flight: usize,
    pub max_retries: usize,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub call_timeout_secs: u64,
    pub cache_ttl_hours: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            prompt_version: "v1".to_string(),
            max_in_flight: 5,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            call_timeout_secs: 30,
            cache_ttl_hours: 72,
        }
    }
}

impl EnrichmentConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BriefingConfig {
    /// Overall budget from news fetching through the market overview
    pub deadline_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_items_per_source: usize,
    pub flat_threshold_percent: f64,
}

impl Default for BriefingConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 240,
            fetch_timeout_secs: 15,
            max_items_per_source: 5,
            flat_threshold_percent: 0.3,
        }
    }
}

impl BriefingConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Keep enrichment results on disk so a restart does not re-enrich everything
    pub persist: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { persist: true }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    /// Defaults to `<data_path>/archive`
    pub dir: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub portfolio: Vec<Instrument>,
    #[serde(default)]
    pub watchlist: Vec<Instrument>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub briefing: BriefingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "tickerbrief", "tickerbrief")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "tickerbrief", "tickerbrief")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn archive_path(&self) -> Result<PathBuf> {
        match &self.archive.dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => Ok(self.default_data_path()?.join("archive")),
        }
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.portfolio.is_empty() {
            bail!("portfolio must contain at least one instrument");
        }
        if let Some(blank) = self
            .portfolio
            .iter()
            .chain(&self.watchlist)
            .find(|i| i.ticker.trim().is_empty())
        {
            bail!("instrument '{}' has an empty ticker", blank.name);
        }
        if self.enrichment.max_in_flight == 0 {
            bail!("enrichment.max_in_flight must be at least 1");
        }
        Ok(())
    }
}
