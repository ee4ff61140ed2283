//! Synchronizer error definitions

use contracts::{ContractError, SensorKind};
use thiserror::Error;

/// Errors surfaced by synchronizer construction and lifecycle control.
///
/// Absence of data is never an error: an alignment attempt that finds too
/// little history is counted and skipped, not reported here.
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Configuration Errors =====
    /// Rejected at construction
    #[error("invalid sync configuration at '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    // ===== Lifecycle Errors =====
    /// `start` called while already running
    #[error("synchronizer is already running")]
    AlreadyRunning,

    /// A participating kind has no attached source
    #[error("no source attached for kind '{kind}'")]
    SourceMissing { kind: SensorKind },

    /// A source failed to start; sources started before it stay running
    #[error("source for kind '{kind}' failed to start")]
    SourceStart {
        kind: SensorKind,
        #[source]
        source: ContractError,
    },
}

impl SyncError {
    /// Create configuration error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source start error
    pub fn source_start(kind: SensorKind, source: ContractError) -> Self {
        Self::SourceStart { kind, source }
    }
}
