use super::Archiver;
use crate::orchestrator::BriefingRecord;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends each record as one JSON line to `{dir}/{YYYY}/{MM}/{date}.jsonl`.
pub struct JsonlArchiver {
    root: PathBuf,
}

impl JsonlArchiver {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, record: &BriefingRecord) -> PathBuf {
        let date = record.date;
        self.root
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }
}

impl Archiver for JsonlArchiver {
    fn archive(&self, record: &BriefingRecord) -> Result<PathBuf> {
        let path = self.path_for(record);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let line = serde_json::to_string(record).context("Failed to serialize briefing")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open archive file: {}", path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to write archive file: {}", path.display()))?;

        debug!("Archived briefing to {}", path.display());
        Ok(path)
    }
}
