//! Error taxonomy for the `drywatch` pipeline.
//!
//! Fatal failures abort a run and are reported through [`PipelineError`].
//! Recoverable failures ([`MalformedEntry`], [`MalformedAlertItem`],
//! [`MalformedRow`]) are returned by the individual parse steps so the caller
//! decides whether to skip and continue; the pipeline always skips them.

use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

// ---

/// A single HTTP fetch (plus decoding) that could not produce a document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("unknown text encoding label '{0}'")]
    Encoding(String),
}

/// Which output resource a persistence failure hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Snapshot,
    History,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Snapshot => f.write_str("snapshot"),
            Resource::History => f.write_str("history"),
        }
    }
}

/// Writing or reading one of the output files failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal pipeline failures. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("alert feed unavailable at {url}: {source}")]
    FeedUnavailable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("rainfall table for {date} unavailable at {url}: {source}")]
    DataUnavailable {
        date: NaiveDate,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to persist {resource} at {}: {source}", path.display())]
    Persistence {
        resource: Resource,
        path: PathBuf,
        #[source]
        source: PersistenceError,
    },
}

impl PipelineError {
    /// The output resource involved, if this is a persistence failure.
    pub fn resource(&self) -> Option<Resource> {
        match self {
            PipelineError::Persistence { resource, .. } => Some(*resource),
            _ => None,
        }
    }
}

// ---

/// An entry whose embedded report is not well-formed XML.
#[derive(Debug, Error)]
#[error("entry '{title}' carries a malformed report: {source}")]
pub struct MalformedEntry {
    pub title: String,
    #[source]
    pub source: roxmltree::Error,
}

/// An `Item` element lacking its area name or its kind name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedAlertItem {
    #[error("alert item has no Area/Name")]
    MissingArea,

    #[error("alert item has no Kind/Name")]
    MissingKind,
}

/// The station row was found but its precipitation field is unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRow {
    #[error("row has only {0} columns")]
    MissingColumn(usize),

    #[error("precipitation field '{0}' is not a number")]
    NotANumber(String),

    #[error("precipitation value {0} is negative or not finite")]
    OutOfRange(f64),
}
