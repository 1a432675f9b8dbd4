//! Persisted run records.
//!
//! One JSON file per trial, named `{scenario}_run{run_id}_{timestamp}.json`.
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never observes a partial record.

use crate::graders::{all_pass, GradeResult};
use crate::transcript::Transcript;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid run record {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RecordResult<T> = Result<T, RecordError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub run_id: u32,
    pub temperature: f32,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub scenario: String,
    /// The scenario document exactly as loaded
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_config: Option<RunConfig>,
    #[serde(default)]
    pub transcript: Transcript,
    #[serde(default)]
    pub grades: Vec<GradeResult>,
    #[serde(default)]
    pub timestamp: String,
}

/// Local time in the record timestamp format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl RunRecord {
    pub fn new(
        scenario: impl Into<String>,
        config: serde_json::Value,
        run_config: RunConfig,
        transcript: Transcript,
        grades: Vec<GradeResult>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            config,
            run_config: Some(run_config),
            transcript,
            grades,
            timestamp: timestamp_now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn run_id(&self) -> Option<u32> {
        self.run_config.map(|config| config.run_id)
    }

    pub fn passed(&self) -> bool {
        all_pass(&self.grades)
    }

    /// Rubric total of the last rubric grade, zero if there is none.
    pub fn score(&self) -> f64 {
        self.grades
            .iter()
            .filter_map(GradeResult::rubric)
            .last()
            .map(|grade| grade.total_score())
            .unwrap_or(0.0)
    }

    pub fn file_name(&self) -> String {
        match self.run_id() {
            Some(run_id) => format!("{}_run{}_{}.json", self.scenario, run_id, self.timestamp),
            None => format!("{}_{}.json", self.scenario, self.timestamp),
        }
    }

    /// Write the record into `dir` and return the final path.
    pub fn persist(&self, dir: &Path) -> RecordResult<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|source| RecordError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(self.file_name());
        let tmp = dir.join(format!(".{}.tmp", self.file_name()));
        let json = serde_json::to_string_pretty(self)?;

        if let Err(source) = std::fs::write(&tmp, json) {
            let _ = std::fs::remove_file(&tmp);
            return Err(RecordError::Io { path: tmp, source });
        }
        if let Err(source) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(RecordError::Io { path, source });
        }

        debug!(path = %path.display(), "Run record written");
        Ok(path)
    }

    pub fn load(path: &Path) -> RecordResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| RecordError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| RecordError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A record together with the file it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRecord {
    pub file_name: String,
    pub record: RunRecord,
}

/// Every `*.json` record directly under `dir`, sorted by file name.
///
/// Unreadable or malformed files are skipped with a warning.
pub fn load_dir(dir: &Path) -> RecordResult<Vec<LoadedRecord>> {
    let entries = std::fs::read_dir(dir).map_err(|source| RecordError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        match RunRecord::load(&path) {
            Ok(record) => records.push(LoadedRecord {
                file_name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                record,
            }),
            Err(e) => warn!("Skipping run record: {}", e),
        }
    }

    Ok(records)
}
