//! Report sink
//!
//! A sink accumulates per-test entries and their steps in memory and writes
//! the whole document to disk on flush. The artifact filename is fixed with a
//! timestamp when the sink is built, so repeated flushes overwrite the same
//! file and the last flush wins.

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::Error;

/// Severity of a reported step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepLevel {
    Info,
    Pass,
    Fail,
}

impl std::fmt::Display for StepLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepLevel::Info => write!(f, "info"),
            StepLevel::Pass => write!(f, "pass"),
            StepLevel::Fail => write!(f, "fail"),
        }
    }
}

/// Handle to one test entry inside a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub u64);

/// Destination for test results
pub trait ReportSink: Send + Sync + std::fmt::Debug {
    /// Start a new test entry
    fn create_entry(&self, name: &str, description: &str) -> Result<EntryId, Error>;

    /// Record a step under an entry
    fn log_step(&self, entry: EntryId, level: StepLevel, message: &str) -> Result<(), Error>;

    /// Associate a screenshot file with an entry
    fn attach_screenshot(&self, entry: EntryId, path: &Path, caption: &str) -> Result<(), Error>;

    /// Write the report artifact to disk
    fn flush(&self) -> Result<(), Error>;
}

#[derive(Debug, Serialize)]
struct StepRecord {
    timestamp: String,
    level: StepLevel,
    message: String,
}

#[derive(Debug, Serialize)]
struct ScreenshotRecord {
    path: String,
    caption: String,
}

#[derive(Debug, Serialize)]
struct EntryRecord {
    id: u64,
    name: String,
    description: String,
    steps: Vec<StepRecord>,
    screenshots: Vec<ScreenshotRecord>,
}

#[derive(Debug, Serialize)]
struct ReportDocument {
    tool: String,
    started_at: String,
    entries: Vec<EntryRecord>,
}

/// Sink writing a JSON report document
#[derive(Debug)]
pub struct JsonReportSink {
    path: PathBuf,
    doc: Mutex<ReportDocument>,
}

impl JsonReportSink {
    /// Build a sink whose artifact lands under `reports_dir` with a
    /// timestamped filename
    pub fn new(reports_dir: &Path) -> Self {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = reports_dir.join(format!("report_{}.json", stamp));
        Self::at_path(path)
    }

    /// Build a sink writing to an exact path
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            doc: Mutex::new(ReportDocument {
                tool: format!("webcheck {}", crate::VERSION),
                started_at: Local::now().to_rfc3339(),
                entries: Vec::new(),
            }),
        }
    }

    /// Where the artifact will be written
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn doc(&self) -> std::sync::MutexGuard<'_, ReportDocument> {
        self.doc.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReportSink for JsonReportSink {
    fn create_entry(&self, name: &str, description: &str) -> Result<EntryId, Error> {
        let mut doc = self.doc();
        let id = doc.entries.len() as u64;
        doc.entries.push(EntryRecord {
            id,
            name: name.to_string(),
            description: description.to_string(),
            steps: Vec::new(),
            screenshots: Vec::new(),
        });
        debug!("Created report entry {} ({})", id, name);
        Ok(EntryId(id))
    }

    fn log_step(&self, entry: EntryId, level: StepLevel, message: &str) -> Result<(), Error> {
        let mut doc = self.doc();
        let record = doc
            .entries
            .get_mut(entry.0 as usize)
            .ok_or_else(|| Error::report(format!("unknown report entry: {}", entry.0)))?;
        record.steps.push(StepRecord {
            timestamp: Local::now().to_rfc3339(),
            level,
            message: message.to_string(),
        });
        Ok(())
    }

    fn attach_screenshot(&self, entry: EntryId, path: &Path, caption: &str) -> Result<(), Error> {
        let mut doc = self.doc();
        let record = doc
            .entries
            .get_mut(entry.0 as usize)
            .ok_or_else(|| Error::report(format!("unknown report entry: {}", entry.0)))?;
        record.screenshots.push(ScreenshotRecord {
            path: path.display().to_string(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let json = {
            let doc = self.doc();
            serde_json::to_string_pretty(&*doc)?
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        info!("Report written to {}", self.path.display());
        Ok(())
    }
}
