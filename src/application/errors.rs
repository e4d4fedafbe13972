//! Run-level error taxonomy
//!
//! Engine and planner failures are fatal to a run. Probe failures live in
//! [`crate::application::reachability::ProbeError`] and never reach this type.

use thiserror::Error;

use crate::domain::repositories::RepositoryError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("Central image mapping document '{collection}/{document}' does not exist")]
    MappingNotFound { collection: String, document: String },

    #[error("Backup write failed, store left untouched: {reason}")]
    BackupFailed { reason: String },

    #[error(
        "Corrective write failed after backup '{backup_id}' was committed; \
         the store holds a backup with no corresponding correction: {reason}"
    )]
    WriteFailed { backup_id: String, reason: String },
}

/// What the store looks like after a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// No write was attempted or none committed.
    Untouched,
    /// The backup committed but the corrective write did not.
    BackupOnly { backup_id: String },
    /// Read-side failure, no writes involved.
    NotApplicable,
}

impl ReconcileError {
    /// Translate an adapter error raised while reading one of the sources.
    pub fn from_read(source_name: &str, error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { collection, id } => Self::MappingNotFound {
                collection,
                document: id,
            },
            other => Self::SourceUnavailable {
                source_name: source_name.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub fn backup_failed(error: &RepositoryError) -> Self {
        Self::BackupFailed {
            reason: error.to_string(),
        }
    }

    pub fn write_failed(backup_id: &str, error: &RepositoryError) -> Self {
        Self::WriteFailed {
            backup_id: backup_id.to_string(),
            reason: error.to_string(),
        }
    }

    pub fn store_state(&self) -> StoreState {
        match self {
            Self::SourceUnavailable { .. } | Self::MappingNotFound { .. } => StoreState::NotApplicable,
            Self::BackupFailed { .. } => StoreState::Untouched,
            Self::WriteFailed { backup_id, .. } => StoreState::BackupOnly {
                backup_id: backup_id.clone(),
            },
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
