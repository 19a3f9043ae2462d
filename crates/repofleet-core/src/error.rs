//! Error types for discovery, inspection and batch operations.
//!
//! Per-repository failures during a batch never surface as `FleetError`;
//! they are folded into an [`crate::batch::OperationOutcome`] instead. The
//! variants here cover caller-input errors and the invocation failures that
//! the inspector and engine translate into sentinels or outcomes.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the repofleet core.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The scan root supplied by the operator is missing or not a directory.
    #[error("invalid scan root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// A repository path was not part of the last registry rebuild.
    #[error("repository not found in registry: {path}")]
    RepoNotFound { path: PathBuf },

    /// The git executable could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A git invocation exceeded its time budget.
    #[error("{operation} timed out after {secs}s in {path}")]
    Timeout {
        operation: String,
        path: PathBuf,
        secs: u64,
    },

    /// The operation was cancelled before every repository was processed.
    #[error("operation cancelled")]
    Cancelled,

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias.
pub type FleetResult<T> = std::result::Result<T, FleetError>;
