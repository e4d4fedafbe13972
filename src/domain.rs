//! Domain module - records, verdicts and repository interfaces
//!
//! This module contains the data model shared by the reconciliation engine,
//! the mutation planner and the store adapters.

pub mod image_record;
pub mod repositories;
pub mod url_validator;

// Re-export commonly used items for convenience
pub use image_record::{CentralMapping, ConsistencyVerdict, DiffEntry, ImageRecord, ProductRecord};
pub use repositories::{
    BackupRepository, BackupSummary, ImageMappingRepository, MappingBackup, MappingWriteRepository,
    ProductRepository, RepositoryError, RepositoryResult,
};
pub use url_validator::{is_valid_url, PartialRecord, UrlSide};
