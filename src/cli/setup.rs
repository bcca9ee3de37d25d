use super::ui;
use crate::core::config::AppConfig;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::info;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// Writes the example configuration to the platform config directory.
pub fn setup() -> Result<()> {
    setup_at_path(AppConfig::default_config_path()?)
}

/// Writes the example configuration to `path`. Never overwrites an existing
/// file.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        bail!(
            "Configuration file already exists at {}; edit it or remove it first",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;
    info!(path = %path.display(), "Wrote example configuration");

    println!("Wrote example configuration to {}", path.display());
    let key_env = example_key_env()?;
    if std::env::var_os(&key_env).is_none() {
        println!(
            "{}",
            ui::style_text(
                &format!("Set {key_env} before running `tickerbrief briefing`"),
                ui::StyleType::Warning
            )
        );
    }
    Ok(())
}

/// Name of the API key variable the example configuration points at.
fn example_key_env() -> Result<String> {
    let config: AppConfig =
        serde_yaml::from_str(EXAMPLE_CONFIG).context("Example configuration is malformed")?;
    Ok(config.enrichment.api_key_env)
}
