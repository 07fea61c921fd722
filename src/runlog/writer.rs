use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::Result;
use crate::runlog::classifier::classify_error;
use crate::runlog::timestamp::now_timestamp;
use crate::types::{LogEntry, RunSummary};

pub const HEADER: [&str; 6] = [
    "timestamp",
    "success",
    "ticketsFound",
    "errorMessage",
    "runDuration",
    "captchaDetected",
];

/// Append-only CSV log, one row per scheduled run. Single writer.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the run and swallow any failure: logging never changes a run's outcome.
    pub fn record(&self, summary: &RunSummary) {
        let entry = entry_for(summary, now_timestamp());
        match self.append(&entry) {
            Ok(()) => info!(
                path = %self.path.display(),
                attempts = summary.attempts,
                "Scraping information logged to {}",
                self.path.display()
            ),
            Err(e) => error!(path = %self.path.display(), "Error logging scraping information: {e}"),
        }
    }

    /// Append one row, writing the header first if the file is new or empty.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            wtr.write_record(HEADER)?;
        }
        wtr.serialize(entry)?;
        wtr.flush()?;
        Ok(())
    }
}

/// Build the CSV row for a run; the raw diagnostic is reduced to its label here.
pub fn entry_for(summary: &RunSummary, timestamp: String) -> LogEntry {
    LogEntry {
        timestamp,
        success: summary.success,
        tickets_found: summary.tickets_found,
        error_message: classify_error(summary.error.as_deref()),
        run_duration: u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
        captcha_detected: summary.captcha_detected,
    }
}
