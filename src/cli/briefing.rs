use super::ui;
use crate::core::config::AppConfig;
use crate::orchestrator::{BriefingOrchestrator, BriefingRecord};
use crate::output::{
    Archiver, ConsoleNotifier, JsonlArchiver, MarkdownRenderer, Notifier, Renderer,
};
use crate::providers;
use crate::store::open_cache_store;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to an assembled briefing after the run.
#[derive(Debug, Default, PartialEq)]
pub struct Delivery {
    pub notified: bool,
    pub archived: Option<PathBuf>,
}

/// Renders the record, hands it to the notifier and archives it. Failures
/// are logged and reflected in the returned [`Delivery`], never propagated.
pub async fn publish(
    record: &BriefingRecord,
    renderer: &dyn Renderer,
    notifier: &dyn Notifier,
    archiver: Option<&dyn Archiver>,
) -> Delivery {
    let message = renderer.render(record);

    let notified = match notifier.notify(&message).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Failed to deliver briefing");
            false
        }
    };

    let archived = archiver.and_then(|archiver| match archiver.archive(record) {
        Ok(path) => {
            info!("Briefing archived at {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!(error = %e, "Failed to archive briefing");
            None
        }
    });

    Delivery { notified, archived }
}

fn print_degraded_notice(record: &BriefingRecord) {
    if !record.degraded {
        return;
    }
    ui::print_separator();
    println!(
        "{}",
        ui::style_text("Briefing is incomplete:", ui::StyleType::Warning)
    );
    for failure in &record.source_failures {
        println!(
            "{}",
            ui::style_text(
                &format!("  {} / {}: {}", failure.ticker, failure.source, failure.reason),
                ui::StyleType::Subtle
            )
        );
    }
    if !record.price_gaps.is_empty() {
        println!(
            "{}",
            ui::style_text(
                &format!("  No prices for {}", record.price_gaps.join(", ")),
                ui::StyleType::Subtle
            )
        );
    }
    if record.dropped_items > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!("  {} news items could not be summarized", record.dropped_items),
                ui::StyleType::Subtle
            )
        );
    }
}

/// Runs a full briefing and delivers it to the console and the archive.
pub async fn run(config: &AppConfig) -> Result<()> {
    let cache = open_cache_store(config)?;
    let backend = Arc::new(providers::completion_backend(&config.enrichment)?);
    let mut orchestrator = BriefingOrchestrator::from_config(config, cache, backend)?;

    let spinner = ui::new_spinner("Preparing briefing...");
    let result = orchestrator.run().await;
    spinner.finish_and_clear();
    let record = result.context("Briefing run failed")?;

    let archiver = if config.archive.enabled {
        Some(JsonlArchiver::new(config.archive_path()?))
    } else {
        None
    };
    publish(
        &record,
        &MarkdownRenderer,
        &ConsoleNotifier::new(),
        archiver.as_ref().map(|a| a as &dyn Archiver),
    )
    .await;

    print_degraded_notice(&record);
    Ok(())
}
