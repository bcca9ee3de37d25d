use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tickerbrief::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Build today's briefing, print it and archive it
    Briefing,
    /// Display daily price changes for portfolio and watchlist
    Prices,
    /// Manage the enrichment cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove expired entries
    Purge,
}

impl From<Commands> for tickerbrief::AppCommand {
    fn from(cmd: Commands) -> tickerbrief::AppCommand {
        match cmd {
            Commands::Briefing => tickerbrief::AppCommand::Briefing,
            Commands::Prices => tickerbrief::AppCommand::Prices,
            Commands::Cache {
                action: CacheAction::Purge,
            } => tickerbrief::AppCommand::CachePurge,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => tickerbrief::cli::setup::setup_at_path(path),
            None => tickerbrief::cli::setup::setup(),
        },
        Some(cmd) => tickerbrief::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
