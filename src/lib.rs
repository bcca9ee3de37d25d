pub mod cli;
pub mod core;
pub mod dedup;
pub mod enrichment;
pub mod orchestrator;
pub mod output;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Briefing,
    Prices,
    CachePurge,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("tickerbrief starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Briefing => cli::briefing::run(&config).await,
        AppCommand::Prices => cli::prices::run(&config).await,
        AppCommand::CachePurge => cli::cache::purge(&config).await,
    }
}
