//! Adapters that consume an assembled briefing. All of them are best-effort:
//! a failure is reported to the caller for logging and never affects the run.

pub mod archive;
pub mod console;
pub mod markdown;

use crate::orchestrator::BriefingRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub use archive::JsonlArchiver;
pub use console::ConsoleNotifier;
pub use markdown::MarkdownRenderer;

pub trait Renderer {
    fn render(&self, record: &BriefingRecord) -> String;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

pub trait Archiver {
    /// Stores the record and returns where it went.
    fn archive(&self, record: &BriefingRecord) -> Result<PathBuf>;
}
