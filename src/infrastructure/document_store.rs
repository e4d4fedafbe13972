//! Document store adapter over SQLite
//!
//! Documents are JSON bodies keyed by `(collection, id)` in a single table.
//! Only the fields the engine reads survive the boundary; everything else in a
//! product or mapping document is dropped here.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::image_record::{CentralMapping, ProductRecord};
use crate::domain::repositories::{
    BackupRepository, BackupSummary, ImageMappingRepository, MappingBackup, MappingWriteRepository,
    ProductRepository, RepositoryError, RepositoryResult,
};
use crate::infrastructure::config::StoreConfig;

const SELECT_DOCUMENT_SQL: &str = "SELECT body FROM documents WHERE collection = ? AND id = ?";

/// Repository for the mapping, product and backup collections
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    mapping_collection: String,
    mapping_document: String,
    products_collection: String,
    backup_collection: String,
    operation_timeout: Duration,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool, config: &StoreConfig) -> Self {
        Self {
            pool,
            mapping_collection: config.mapping_collection.clone(),
            mapping_document: config.mapping_document.clone(),
            products_collection: config.products_collection.clone(),
            backup_collection: config.backup_collection.clone(),
            operation_timeout: config.operation_timeout(),
        }
    }

    /// Run a store operation under the configured timeout.
    async fn timed<T, F>(&self, operation: &str, fut: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.operation_timeout.as_millis() as u64, "Store operation timed out");
                Err(RepositoryError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms: self.operation_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Insert or replace a raw document.
    pub async fn put_document(&self, collection: &str, id: &str, body: &Value) -> RepositoryResult<()> {
        self.timed("put_document", async {
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, body)
                VALUES (?, ?, ?)
                ON CONFLICT (collection, id)
                DO UPDATE SET body = excluded.body, updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(collection)
            .bind(id)
            .bind(body.to_string())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::write_rejected)?;
            Ok(())
        })
        .await
    }

    /// Raw document body, if present.
    pub async fn get_document(&self, collection: &str, id: &str) -> RepositoryResult<Option<Value>> {
        self.timed("get_document", async {
            let row: Option<(String,)> = sqlx::query_as(SELECT_DOCUMENT_SQL)
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::unavailable)?;

            row.map(|(body,)| parse_object(collection, id, &body)).transpose()
        })
        .await
    }

    fn malformed(&self, collection: &str, id: &str, reason: impl ToString) -> RepositoryError {
        RepositoryError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

fn parse_object(collection: &str, id: &str, body: &str) -> RepositoryResult<Value> {
    let value: Value = serde_json::from_str(body).map_err(|e| RepositoryError::Malformed {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    if value.is_object() {
        Ok(value)
    } else {
        Err(RepositoryError::Malformed {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: "document body is not an object".to_string(),
        })
    }
}

/// An absent `images` field is an empty mapping. Anything present must be an
/// object of strings, `null` included.
fn mapping_from_document(body: &Value) -> Result<CentralMapping, String> {
    match body.get("images") {
        None => Ok(CentralMapping::new()),
        Some(images @ Value::Object(_)) => serde_json::from_value::<BTreeMap<String, String>>(images.clone())
            .map(CentralMapping::from)
            .map_err(|e| format!("images field: {e}")),
        Some(other) => Err(format!("images field is not an object: {other}")),
    }
}

/// Keep only `name` and `image`; a non-string `image` reads as absent.
fn product_from_document(id: String, body: &Value) -> ProductRecord {
    let name = body.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let image = match body.get("image") {
        Some(Value::String(url)) => Some(url.clone()),
        Some(Value::Null) | None => None,
        Some(other) => {
            debug!(id = %id, value = %other, "Non-string image field read as absent");
            None
        }
    };
    ProductRecord { id, name, image }
}

#[async_trait]
impl ImageMappingRepository for SqliteDocumentStore {
    async fn fetch_central_mapping(&self) -> RepositoryResult<CentralMapping> {
        let collection = self.mapping_collection.as_str();
        let id = self.mapping_document.as_str();

        self.timed("fetch_central_mapping", async {
            let row: Option<(String,)> = sqlx::query_as(SELECT_DOCUMENT_SQL)
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::unavailable)?;

            let Some((body,)) = row else {
                return Err(RepositoryError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            };

            let document = parse_object(collection, id, &body)?;
            mapping_from_document(&document).map_err(|reason| self.malformed(collection, id, reason))
        })
        .await
    }
}

#[async_trait]
impl ProductRepository for SqliteDocumentStore {
    async fn fetch_all_products(&self) -> RepositoryResult<Vec<ProductRecord>> {
        let collection = self.products_collection.as_str();

        self.timed("fetch_all_products", async {
            let rows: Vec<(String, String)> =
                sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")
                    .bind(collection)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(RepositoryError::unavailable)?;

            rows.into_iter()
                .map(|(id, body)| {
                    let value = parse_object(collection, &id, &body)?;
                    Ok(product_from_document(id, &value))
                })
                .collect()
        })
        .await
    }
}

#[async_trait]
impl MappingWriteRepository for SqliteDocumentStore {
    async fn write_backup(&self, backup: &MappingBackup) -> RepositoryResult<String> {
        let simple = Uuid::new_v4().simple().to_string();
        let backup_id = format!(
            "backup-{}-{}",
            backup.backed_up_at.format("%Y%m%dT%H%M%S"),
            &simple[..8]
        );
        let body = json!({
            "images": backup.images,
            "backedUpAt": backup.backed_up_at.to_rfc3339(),
            "sourceCollection": self.mapping_collection,
            "sourceDocument": self.mapping_document,
            "orphanKeys": backup.orphan_keys,
            "keyCount": backup.images.len(),
        });

        self.timed("write_backup", async {
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(&self.backup_collection)
                .bind(&backup_id)
                .bind(body.to_string())
                .execute(&self.pool)
                .await
                .map_err(RepositoryError::write_rejected)?;
            Ok(())
        })
        .await?;

        info!(collection = %self.backup_collection, backup_id = %backup_id, "Backup document written");
        Ok(backup_id)
    }

    async fn write_corrected_mapping(&self, mapping: &CentralMapping) -> RepositoryResult<()> {
        let collection = self.mapping_collection.as_str();
        let id = self.mapping_document.as_str();

        self.timed("write_corrected_mapping", async {
            let mut tx = self.pool.begin().await.map_err(RepositoryError::write_rejected)?;

            let row: Option<(String,)> = sqlx::query_as(SELECT_DOCUMENT_SQL)
                .bind(collection)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(RepositoryError::write_rejected)?;

            let Some((body,)) = row else {
                return Err(RepositoryError::write_rejected(format!(
                    "mapping document '{collection}/{id}' no longer exists"
                )));
            };

            let mut document = parse_object(collection, id, &body)?;
            if let Some(fields) = document.as_object_mut() {
                fields.insert("images".to_string(), json!(mapping));
                fields.insert("updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
            }

            sqlx::query(
                "UPDATE documents SET body = ?, updated_at = CURRENT_TIMESTAMP WHERE collection = ? AND id = ?",
            )
            .bind(document.to_string())
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::write_rejected)?;

            tx.commit().await.map_err(RepositoryError::write_rejected)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl BackupRepository for SqliteDocumentStore {
    async fn list_backups(&self, limit: usize) -> RepositoryResult<Vec<BackupSummary>> {
        let collection = self.backup_collection.as_str();

        self.timed("list_backups", async {
            let rows: Vec<(String, String)> =
                sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? ORDER BY created_at DESC, rowid DESC LIMIT ?")
                    .bind(collection)
                    .bind(i64::try_from(limit).unwrap_or(i64::MAX))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(RepositoryError::unavailable)?;

            rows.into_iter()
                .map(|(id, body)| {
                    let value = parse_object(collection, &id, &body)?;
                    Ok(BackupSummary {
                        backed_up_at: value.get("backedUpAt").and_then(Value::as_str).map(str::to_string),
                        key_count: value.get("images").and_then(Value::as_object).map_or(0, |m| m.len()),
                        orphan_count: value.get("orphanKeys").and_then(Value::as_array).map_or(0, Vec::len),
                        id,
                    })
                })
                .collect()
        })
        .await
    }
}
