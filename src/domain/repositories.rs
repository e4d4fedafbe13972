//! Repository interfaces for the image mapping and product documents
//!
//! The engine never talks to a store directly. These traits are the read and
//! write seams the document store adapter implements; tests substitute their
//! own recording implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::domain::image_record::{CentralMapping, ProductRecord};

/// Adapter-level failure, translated into a run-level error by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Document '{collection}/{id}' not found")]
    NotFound { collection: String, id: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Malformed document '{collection}/{id}': {reason}")]
    Malformed {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Store operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Write rejected: {reason}")]
    WriteRejected { reason: String },
}

impl RepositoryError {
    pub fn unavailable(reason: impl ToString) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    pub fn write_rejected(reason: impl ToString) -> Self {
        Self::WriteRejected {
            reason: reason.to_string(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Verbatim copy of the mapping taken before a corrective write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingBackup {
    pub images: CentralMapping,
    pub backed_up_at: DateTime<Utc>,
    pub orphan_keys: BTreeSet<String>,
}

/// Listing entry for a stored backup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub id: String,
    pub backed_up_at: Option<String>,
    pub key_count: usize,
    pub orphan_count: usize,
}

#[async_trait]
pub trait ImageMappingRepository: Send + Sync {
    /// `NotFound` when the mapping document does not exist, which is distinct
    /// from a document holding an empty mapping.
    async fn fetch_central_mapping(&self) -> RepositoryResult<CentralMapping>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn fetch_all_products(&self) -> RepositoryResult<Vec<ProductRecord>>;
}

#[async_trait]
pub trait MappingWriteRepository: Send + Sync {
    /// Commits the backup document and returns its id.
    async fn write_backup(&self, backup: &MappingBackup) -> RepositoryResult<String>;

    /// Overwrites the mapping's `images` field and its `updatedAt` marker.
    async fn write_corrected_mapping(&self, mapping: &CentralMapping) -> RepositoryResult<()>;
}

#[async_trait]
pub trait BackupRepository: Send + Sync {
    /// Newest first.
    async fn list_backups(&self, limit: usize) -> RepositoryResult<Vec<BackupSummary>>;
}
