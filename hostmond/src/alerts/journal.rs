use chrono::Local;
use log::warn;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::TIMESTAMP_FORMAT;

/// One dispatch attempt as written to the journal.
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub timestamp: String,
    pub sink: &'static str,
    pub message: String,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Append-only JSON-lines log of every alert dispatch and its outcome.
pub struct AlertJournal {
    path: PathBuf,
}

impl AlertJournal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures are logged and swallowed; the journal never affects a tick.
    pub fn record(&self, sink: &'static str, message: &str, outcome: Result<(), String>) {
        let record = AlertRecord {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            sink,
            message: message.to_string(),
            delivered: outcome.is_ok(),
            error: outcome.err(),
        };

        if let Err(err) = self.append(&record) {
            warn!(
                "[alerts] journal {} not written: {err}",
                self.path.display()
            );
        }
    }

    /// One JSON object per line, written with a single `write_all`.
    fn append(&self, record: &AlertRecord) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let mut line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        line.push(b'\n');
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(&line)
    }
}
