//! Reliability reports over persisted run records.
//!
//! Reports are derived only from the records on disk: a Markdown summary with
//! pass@k / pass^k per scenario, and a data script for the static dashboard.

pub mod dashboard;
pub mod markdown;
pub mod stats;

pub use dashboard::{dashboard_entries, render_dashboard_data};
pub use markdown::render_markdown;
pub use stats::{aggregate, ScenarioStats};

use crate::record::{load_dir, LoadedRecord, RecordError, RecordResult};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MARKDOWN_FILE: &str = "latest_report.md";
pub const DASHBOARD_FILE: &str = "data.js";

pub struct ReportBuilder {
    records: Vec<LoadedRecord>,
}

impl ReportBuilder {
    pub fn new(records: Vec<LoadedRecord>) -> Self {
        Self { records }
    }

    /// Read every run record in `runs_dir`.
    pub fn from_dir(runs_dir: &Path) -> RecordResult<Self> {
        let records = load_dir(runs_dir)?;
        info!(
            runs_dir = %runs_dir.display(),
            records = records.len(),
            "Loaded run records"
        );
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[LoadedRecord] {
        &self.records
    }

    pub fn stats(&self) -> Vec<ScenarioStats> {
        aggregate(self.records.iter().map(|loaded| &loaded.record))
    }

    pub fn markdown(&self) -> String {
        render_markdown(&self.records)
    }

    pub fn dashboard_data(&self) -> RecordResult<String> {
        Ok(render_dashboard_data(&self.records)?)
    }

    pub fn write_markdown(&self, path: &Path) -> RecordResult<PathBuf> {
        write_file(path, &self.markdown())?;
        info!(path = %path.display(), "Report written");
        Ok(path.to_path_buf())
    }

    pub fn write_dashboard(&self, path: &Path) -> RecordResult<PathBuf> {
        write_file(path, &self.dashboard_data()?)?;
        info!(path = %path.display(), records = self.records.len(), "Dashboard data written");
        Ok(path.to_path_buf())
    }
}

fn write_file(path: &Path, contents: &str) -> RecordResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RecordError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, contents).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })
}
