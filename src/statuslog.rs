use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::models::StatusLogEntry;

pub const LOG_FILE_NAME: &str = "email_log.csv";

/// Narrow seam over the append-only outcome log so the dispatch loop can be
/// tested against an in-memory stand-in.
pub trait StatusLog {
    fn append(&mut self, entry: StatusLogEntry) -> anyhow::Result<()>;
    fn read_all(&self) -> anyhow::Result<Vec<StatusLogEntry>>;
}

/// CSV-backed log at `<log_dir>/email_log.csv`. Each append reads the existing
/// table, adds one row, and rewrites the file in full; the file and its header
/// are created on first use. No locking, single-writer by assumption.
pub struct CsvStatusLog {
    path: PathBuf,
}

impl CsvStatusLog {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            path: log_dir.join(LOG_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusLog for CsvStatusLog {
    fn append(&mut self, entry: StatusLogEntry) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
        }

        let mut entries = self.read_all()?;
        entries.push(entry);

        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("failed to write log {}", self.path.display()))?;
        for entry in &entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read_all(&self) -> anyhow::Result<Vec<StatusLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to read log {}", self.path.display()))?;
        let mut entries = Vec::new();
        for row in reader.deserialize() {
            entries.push(row?);
        }
        Ok(entries)
    }
}
