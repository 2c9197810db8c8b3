//! Core data types for the transcript-recorder crate.
//!
//! This module defines the types shared by the recorder and its callers:
//! - `ConfigError` / `RecorderError`: hard failures (bad configuration, I/O)
//! - `NotFound`: expected, recoverable "nothing to capture right now" reasons
//! - `SnapshotRecord`: metadata for one exported snapshot file
//! - `ExportOutcome` / `MergeOutcome`: results of the recorder's operations
//! - `RecorderState`: the recorder's element-tracking state

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating an application configuration.
///
/// These indicate a deployment mistake and are surfaced when a recorder is
/// constructed, never during polling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// A key is present but has the wrong type or an unusable value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The configuration does not have the expected JSON shape
    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested application key is not in the configuration file
    #[error("Application not found in configuration: {0}")]
    UnknownApp(String),
}

/// Errors returned by recorder and merge operations.
///
/// "Element not present right now" is deliberately not an error; see
/// [`NotFound`].
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Creating a directory, or reading/writing a snapshot, index or merge file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A caller-supplied file name was not a plain name inside the base directory
    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),
}

impl RecorderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecorderError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why there is nothing to capture right now.
///
/// All variants are recoverable: a polling caller skips the cycle and tries
/// again later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NotFound {
    /// Accessibility permission not granted
    #[error("accessibility permission not granted")]
    PermissionDenied,

    /// No process matched the configured command paths or app names
    #[error("no matching application process is running")]
    NoProcesses,

    /// The configuration has no search paths to try
    #[error("no search paths configured")]
    NoSearchPaths,

    /// Every (process, search path) combination failed
    #[error("no search path matched the transcript element")]
    NoPathMatched,

    /// The cached element produced no text, so it was re-resolved
    #[error("transcript element produced no text")]
    NoTextCollected,
}

/// Metadata for one exported snapshot file.
///
/// Serialized as-is into the snapshots index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Path of the snapshot text file
    pub file_path: String,

    /// ISO-8601 export time
    pub timestamp: String,

    /// Number of lines written
    pub text_element_count: usize,
}

/// Result of one `export_transcript_text` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A snapshot file was written
    Exported(SnapshotRecord),
    /// Nothing was written; retry on the next poll
    NotFound(NotFound),
}

impl ExportOutcome {
    pub fn is_exported(&self) -> bool {
        matches!(self, ExportOutcome::Exported(_))
    }

    pub fn snapshot(&self) -> Option<&SnapshotRecord> {
        match self {
            ExportOutcome::Exported(record) => Some(record),
            ExportOutcome::NotFound(_) => None,
        }
    }
}

/// Result of folding the recorded snapshots into one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Two or more snapshots were merged into `path`
    Merged {
        path: PathBuf,
        snapshot_count: usize,
        overlap_count: usize,
    },
    /// Only one snapshot exists; it already is the transcript
    Single(PathBuf),
    /// No snapshots recorded yet
    NoSnapshots,
}

/// Element-tracking state of a recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// No search attempted yet, or every attempt so far failed
    Uninitialized,
    /// A transcript element is cached
    ElementFound,
    /// A text collection is in flight
    Exporting,
    /// A previously found element was lost and not found again
    ElementLost,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecorderState::Uninitialized => "uninitialized",
            RecorderState::ElementFound => "element_found",
            RecorderState::Exporting => "exporting",
            RecorderState::ElementLost => "element_lost",
        };
        f.write_str(name)
    }
}
