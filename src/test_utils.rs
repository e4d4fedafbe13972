//! Test utilities for image-reconciler
//!
//! Provides in-memory repository fakes with failure injection and an isolated
//! SQLite-backed document store so tests never share state.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::domain::image_record::{CentralMapping, ProductRecord};
use crate::domain::repositories::{
    ImageMappingRepository, MappingBackup, MappingWriteRepository, ProductRepository,
    RepositoryError, RepositoryResult,
};
use crate::infrastructure::config::StoreConfig;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::document_store::SqliteDocumentStore;

/// One call observed by [`RecordingWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterCall {
    Backup {
        backup_id: String,
        snapshot: CentralMapping,
    },
    Corrected {
        mapping: CentralMapping,
    },
}

/// Writer that records calls in order and can be told to fail either phase.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    calls: Mutex<Vec<WriterCall>>,
    fail_backup: bool,
    fail_correction: bool,
}

impl RecordingWriter {
    pub fn failing_backup() -> Self {
        Self {
            fail_backup: true,
            ..Self::default()
        }
    }

    pub fn failing_correction() -> Self {
        Self {
            fail_correction: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<WriterCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MappingWriteRepository for RecordingWriter {
    async fn write_backup(&self, backup: &MappingBackup) -> RepositoryResult<String> {
        if self.fail_backup {
            return Err(RepositoryError::write_rejected("backup collection is read-only"));
        }
        let mut calls = self.calls.lock().unwrap();
        let backup_id = format!("backup-test-{}", calls.len() + 1);
        calls.push(WriterCall::Backup {
            backup_id: backup_id.clone(),
            snapshot: backup.images.clone(),
        });
        Ok(backup_id)
    }

    async fn write_corrected_mapping(&self, mapping: &CentralMapping) -> RepositoryResult<()> {
        if self.fail_correction {
            return Err(RepositoryError::write_rejected("mapping document is locked"));
        }
        self.calls.lock().unwrap().push(WriterCall::Corrected {
            mapping: mapping.clone(),
        });
        Ok(())
    }
}

/// All three repositories over plain memory.
#[derive(Debug)]
pub struct InMemoryStore {
    mapping: Mutex<Option<CentralMapping>>,
    products: Vec<ProductRecord>,
    products_unavailable: bool,
    writer: RecordingWriter,
}

impl InMemoryStore {
    pub fn new(mapping: CentralMapping, products: Vec<ProductRecord>) -> Self {
        Self {
            mapping: Mutex::new(Some(mapping)),
            products,
            products_unavailable: false,
            writer: RecordingWriter::default(),
        }
    }

    pub fn without_mapping(products: Vec<ProductRecord>) -> Self {
        Self {
            mapping: Mutex::new(None),
            ..Self::new(CentralMapping::new(), products)
        }
    }

    pub fn with_products_unavailable(mut self) -> Self {
        self.products_unavailable = true;
        self
    }

    pub fn current_mapping(&self) -> Option<CentralMapping> {
        self.mapping.lock().unwrap().clone()
    }

    pub fn backup_count(&self) -> usize {
        self.writer
            .calls()
            .iter()
            .filter(|call| matches!(call, WriterCall::Backup { .. }))
            .count()
    }
}

#[async_trait]
impl ImageMappingRepository for InMemoryStore {
    async fn fetch_central_mapping(&self) -> RepositoryResult<CentralMapping> {
        self.current_mapping().ok_or_else(|| RepositoryError::NotFound {
            collection: "config".to_string(),
            id: "images".to_string(),
        })
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn fetch_all_products(&self) -> RepositoryResult<Vec<ProductRecord>> {
        if self.products_unavailable {
            return Err(RepositoryError::unavailable("connection reset"));
        }
        Ok(self.products.clone())
    }
}

#[async_trait]
impl MappingWriteRepository for InMemoryStore {
    async fn write_backup(&self, backup: &MappingBackup) -> RepositoryResult<String> {
        self.writer.write_backup(backup).await
    }

    async fn write_corrected_mapping(&self, mapping: &CentralMapping) -> RepositoryResult<()> {
        self.writer.write_corrected_mapping(mapping).await?;
        *self.mapping.lock().unwrap() = Some(mapping.clone());
        Ok(())
    }
}

/// SQLite document store in its own temporary directory.
pub struct TestDatabase {
    pub connection: DatabaseConnection,
    pub store: SqliteDocumentStore,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let database_url = format!("sqlite:{}", dir.path().join("store.db").display());
        let connection = DatabaseConnection::new(&database_url).await?;
        connection.migrate().await?;

        let config = StoreConfig {
            database_url,
            ..StoreConfig::default()
        };
        let store = SqliteDocumentStore::new(connection.pool().clone(), &config);

        Ok(Self {
            connection,
            store,
            _dir: dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_creation() {
        let db = TestDatabase::new().await.unwrap();
        assert!(!db.connection.pool().is_closed());
    }

    #[tokio::test]
    async fn test_multiple_databases_are_isolated() {
        let db1 = TestDatabase::new().await.unwrap();
        let db2 = TestDatabase::new().await.unwrap();

        db1.store
            .put_document("products", "A", &serde_json::json!({"name": "Lamp"}))
            .await
            .unwrap();

        assert_eq!(db1.store.fetch_all_products().await.unwrap().len(), 1);
        assert!(db2.store.fetch_all_products().await.unwrap().is_empty());
    }
}
