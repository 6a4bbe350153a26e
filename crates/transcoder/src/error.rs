use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by discovery, classification, process invocation and
/// the batch orchestrator
#[derive(Debug, Error)]
pub enum BatchError {
    /// A root directory, move destination or input file does not exist
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An unrecognized classification method or similar bad input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Move and delete were both requested as post-actions
    #[error("cannot use --delete-source and --move-source at the same time")]
    ConfigurationConflict,

    /// Media metadata could not be read or has no video track
    #[error("failed to probe {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    /// An external tool exited non-zero while strict checking was enabled
    #[error("{program} exited with status {exit_code}")]
    Process { program: String, exit_code: i32 },

    /// An external tool could not be started at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BatchError {
    /// The file or directory the error is about, when there is one
    pub fn path(&self) -> Option<&Path> {
        match self {
            BatchError::NotFound(path)
            | BatchError::Probe { path, .. }
            | BatchError::Io { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BatchError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn probe(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BatchError::Probe {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
