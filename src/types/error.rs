//! Error types for pairsync

use std::path::PathBuf;
use thiserror::Error;

/// Error types for pairsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not well-formed JSON
    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration violates an invariant
    #[error("Configuration error: {0}")]
    Config(String),

    /// A resolved source or destination is not present
    #[error("Path unavailable: {path}")]
    PathUnavailable { path: PathBuf },

    /// The transfer tool could not be run or exited non-zero
    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    /// Permission denied for specific path
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Operator interrupted the run
    #[error("Interrupted by operator")]
    Interrupted,

    /// `--pair` named a pair that is not configured
    #[error("Sync pair '{0}' not found")]
    UnknownPair(String),

    /// Run log could not be created or written
    #[error("Log directory unavailable: {path}: {source}")]
    LogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Check if this error aborts the whole run instead of a single pair
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Json(_)
                | SyncError::Config(_)
                | SyncError::Interrupted
                | SyncError::UnknownPair(_)
                | SyncError::LogUnavailable { .. }
        )
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Config(_) | SyncError::Json(_))
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        match self {
            SyncError::PermissionDenied { .. } => true,
            SyncError::Io(io) => io.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Process exit code for a fatal error
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Interrupted => 130,
            _ => 1,
        }
    }
}
