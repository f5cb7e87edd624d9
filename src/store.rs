//! Output files: the append-only history log and the current-state snapshot.
//!
//! Each run touches both exactly once. Concurrent runs against the same files
//! are not coordinated here.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PersistenceError, PipelineError, Resource};
use crate::models::{HistoryRecord, RiskAssessment, Snapshot};

pub const HISTORY_HEADER: [&str; 6] = ["date", "level", "rain3", "rain30", "dry", "wind"];

// ---

/// Append-only CSV log with one row per run.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HistoryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`, writing the header first when the file does not yet
    /// exist. Rows for a date already present are appended again, never merged.
    pub fn append(&self, record: &HistoryRecord) -> Result<(), PipelineError> {
        // ---
        self.try_append(record)
            .map_err(|source| PipelineError::Persistence {
                resource: Resource::History,
                path: self.path.clone(),
                source,
            })
    }

    fn try_append(&self, record: &HistoryRecord) -> Result<(), PersistenceError> {
        // ---
        let existed = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !existed {
            wtr.write_record(HISTORY_HEADER)?;
        }
        wtr.write_record(record.to_fields())?;
        wtr.flush()?;

        debug!("Appended history row for {} to {}", record.date, self.path.display());
        Ok(())
    }

    /// Read every row back, oldest first. `Ok(None)` when no log exists yet.
    pub fn read_all(&self) -> Result<Option<Vec<HistoryEntry>>, PipelineError> {
        // ---
        if !self.path.exists() {
            return Ok(None);
        }

        let read = || -> Result<Vec<HistoryEntry>, PersistenceError> {
            let mut rdr = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_path(&self.path)?;

            let mut rows = Vec::new();
            for (index, record) in rdr.records().enumerate() {
                let record = record?;
                // A log that existed before its first append has no header.
                if index == 0 && record.iter().eq(HISTORY_HEADER) {
                    continue;
                }
                rows.push(record.deserialize::<HistoryEntry>(None)?);
            }
            Ok(rows)
        };

        read().map(Some).map_err(|source| PipelineError::Persistence {
            resource: Resource::History,
            path: self.path.clone(),
            source,
        })
    }
}

/// A history row as read back from the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    // ---
    pub date: NaiveDate,
    pub level: u8,
    pub rain3: f64,
    pub rain30: f64,
    pub dry: u8,
    pub wind: u8,
}

/// Single JSON document replaced wholesale on every run.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotWriter { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the snapshot with `assessment`.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// target, so readers see either the old or the new snapshot.
    pub fn write(&self, assessment: &RiskAssessment) -> Result<(), PipelineError> {
        // ---
        self.try_write(&assessment.to_snapshot())
            .map_err(|source| self.persistence_error(source))
    }

    fn try_write(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        // ---
        let json = serde_json::to_string_pretty(snapshot)?;

        let tmp = self.tmp_path();
        let replace = || -> Result<(), PersistenceError> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)?;
            Ok(())
        };

        if let Err(err) = replace() {
            fs::remove_file(&tmp).ok();
            return Err(err);
        }

        debug!("Wrote snapshot to {}", self.path.display());
        Ok(())
    }

    /// Load the current snapshot. `Ok(None)` when none has been written.
    pub fn read(&self) -> Result<Option<Snapshot>, PipelineError> {
        // ---
        if !self.path.exists() {
            return Ok(None);
        }

        let read = || -> Result<Snapshot, PersistenceError> {
            let text = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&text)?)
        };

        read().map(Some).map_err(|source| self.persistence_error(source))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persistence_error(&self, source: PersistenceError) -> PipelineError {
        PipelineError::Persistence {
            resource: Resource::Snapshot,
            path: self.path.clone(),
            source,
        }
    }
}
