//! End-to-end reconciliation and cleanup over the SQLite document store

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use image_reconciler::application::errors::ReconcileError;
use image_reconciler::application::mutation_planner::MutationOutcome;
use image_reconciler::application::use_cases::{ImageSyncUseCases, ProbeSource};
use image_reconciler::domain::image_record::ConsistencyVerdict;
use image_reconciler::domain::repositories::{
    BackupRepository, ImageMappingRepository, ProductRepository, RepositoryError,
};
use image_reconciler::infrastructure::config::StoreConfig;
use image_reconciler::infrastructure::database_connection::DatabaseConnection;
use image_reconciler::infrastructure::document_store::SqliteDocumentStore;

struct Fixture {
    database_url: String,
    connection: DatabaseConnection,
    store: Arc<SqliteDocumentStore>,
    _dir: TempDir,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let database_url = format!("sqlite:{}", dir.path().join("store.db").display());
        let connection = DatabaseConnection::new(&database_url).await.unwrap();
        connection.migrate().await.unwrap();

        let config = StoreConfig {
            database_url: database_url.clone(),
            ..StoreConfig::default()
        };
        let store = Arc::new(SqliteDocumentStore::new(connection.pool().clone(), &config));
        Self {
            database_url,
            connection,
            store,
            _dir: dir,
        }
    }

    /// Mapping {A, B, D} against products {A, C, D}: A same, B orphan,
    /// C missing in central, D different.
    async fn seeded() -> Self {
        let fixture = Self::new().await;
        fixture
            .store
            .put_document(
                "config",
                "images",
                &json!({
                    "images": {
                        "A": "https://cdn.example.com/a.png",
                        "B": "https://cdn.example.com/b.png",
                        "D": "https://cdn.example.com/d-old.png"
                    },
                    "owner": "catalog-team"
                }),
            )
            .await
            .unwrap();
        for (id, body) in [
            ("A", json!({"name": "Lamp", "image": "https://cdn.example.com/a.png", "price": 12})),
            ("C", json!({"name": "Chair", "image": "https://cdn.example.com/c.png"})),
            ("D", json!({"name": "Desk", "image": "https://cdn.example.com/d-new.png"})),
        ] {
            fixture.store.put_document("products", id, &body).await.unwrap();
        }
        fixture
    }

    fn use_cases(&self) -> ImageSyncUseCases {
        ImageSyncUseCases::new(self.store.clone(), self.store.clone(), self.store.clone())
    }

    /// A store over its own single-connection pool with a 100ms operation
    /// timeout. Holding that connection stalls every operation.
    async fn stalled_store(&self) -> (DatabaseConnection, Arc<SqliteDocumentStore>) {
        let connection = DatabaseConnection::with_options(&self.database_url, 1, Duration::from_secs(30))
            .await
            .unwrap();
        let config = StoreConfig {
            database_url: self.database_url.clone(),
            operation_timeout_ms: 100,
            ..StoreConfig::default()
        };
        let store = Arc::new(SqliteDocumentStore::new(connection.pool().clone(), &config));
        (connection, store)
    }
}

#[tokio::test]
async fn test_audit_over_stored_documents() {
    let fixture = Fixture::seeded().await;

    let snapshot = fixture.use_cases().audit().await.unwrap();
    let report = snapshot.report;

    assert_eq!(report.same_count, 1);
    assert_eq!(report.diff_count, 1);
    assert_eq!(report.missing_in_central, 1);
    assert_eq!(report.missing_in_product, 1);
    assert_eq!(report.orphan_keys, vec!["B".to_string()]);
    assert_eq!(report.count_of(ConsistencyVerdict::CentralMissing), 1);
    assert_eq!(report.distinct_ids(), 4);
}

#[tokio::test]
async fn test_apply_writes_backup_before_correction() {
    let fixture = Fixture::seeded().await;

    let summary = fixture.use_cases().clean_orphans(true).await.unwrap();
    let (backup_id, removed) = match summary.outcome {
        MutationOutcome::Applied { backup_id, removed } => (backup_id, removed),
        other => panic!("expected applied outcome, got {other:?}"),
    };
    assert_eq!(removed, vec!["B".to_string()]);
    assert!(backup_id.starts_with("backup-"));

    let backup = fixture
        .store
        .get_document("image_mapping_backups", &backup_id)
        .await
        .unwrap()
        .expect("backup document");
    assert_eq!(backup["keyCount"], 3);
    assert_eq!(backup["images"]["B"], "https://cdn.example.com/b.png");
    assert_eq!(backup["orphanKeys"], json!(["B"]));
    assert_eq!(backup["sourceCollection"], "config");
    assert_eq!(backup["sourceDocument"], "images");

    let mapping = fixture.store.fetch_central_mapping().await.unwrap();
    assert_eq!(mapping.len(), 2);
    assert!(!mapping.contains_key("B"));

    let stored = fixture.store.get_document("config", "images").await.unwrap().unwrap();
    assert_eq!(stored["owner"], "catalog-team");
}

#[tokio::test]
async fn test_second_apply_writes_nothing() {
    let fixture = Fixture::seeded().await;
    let cases = fixture.use_cases();

    cases.clean_orphans(true).await.unwrap();
    let second = cases.clean_orphans(true).await.unwrap();

    assert_eq!(second.outcome, MutationOutcome::NoOp);
    assert_eq!(fixture.store.list_backups(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let fixture = Fixture::seeded().await;

    let summary = fixture.use_cases().clean_orphans(false).await.unwrap();

    assert_eq!(
        summary.outcome,
        MutationOutcome::DryRun {
            would_remove: vec!["B".to_string()]
        }
    );
    assert_eq!(fixture.store.fetch_central_mapping().await.unwrap().len(), 3);
    assert!(fixture.store.list_backups(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_mapping_document_is_reported() {
    let fixture = Fixture::new().await;
    fixture
        .store
        .put_document("products", "A", &json!({"name": "Lamp"}))
        .await
        .unwrap();

    let error = fixture.use_cases().audit().await.unwrap_err();

    assert_eq!(
        error,
        ReconcileError::MappingNotFound {
            collection: "config".to_string(),
            document: "images".to_string(),
        }
    );
}

#[tokio::test]
async fn test_products_without_image_field() {
    let fixture = Fixture::new().await;
    fixture.store.put_document("config", "images", &json!({"images": {}})).await.unwrap();
    fixture
        .store
        .put_document("products", "A", &json!({"name": "Lamp", "image": ""}))
        .await
        .unwrap();
    fixture
        .store
        .put_document("products", "B", &json!({"name": "Chair"}))
        .await
        .unwrap();

    let products = fixture.store.fetch_all_products().await.unwrap();
    assert_eq!(products.len(), 2);

    let report = fixture.use_cases().audit().await.unwrap().report;
    assert_eq!(report.count_of(ConsistencyVerdict::BothMissing), 2);
    assert_eq!(report.missing_in_central, 2);
    assert_eq!(report.missing_in_product, 2);

    let targets = fixture.use_cases().probe_targets(ProbeSource::Products).await.unwrap();
    assert!(targets.is_empty());
}

#[tokio::test]
async fn test_connection_closes_cleanly() {
    let fixture = Fixture::seeded().await;
    fixture.connection.close().await;
    assert!(fixture.connection.pool().is_closed());
}

#[tokio::test]
async fn test_stalled_read_times_out_as_source_unavailable() {
    let fixture = Fixture::seeded().await;
    let (connection, stalled) = fixture.stalled_store().await;
    let _held = connection.pool().acquire().await.unwrap();

    let error = stalled.fetch_central_mapping().await.unwrap_err();
    assert!(matches!(error, RepositoryError::Timeout { timeout_ms: 100, .. }));

    let cases = ImageSyncUseCases::new(stalled.clone(), fixture.store.clone(), fixture.store.clone());
    let error = cases.audit().await.unwrap_err();
    assert!(matches!(error, ReconcileError::SourceUnavailable { .. }), "{error:?}");
}

#[tokio::test]
async fn test_stalled_backup_write_leaves_store_untouched() {
    let fixture = Fixture::seeded().await;
    let (connection, stalled) = fixture.stalled_store().await;
    let held = connection.pool().acquire().await.unwrap();

    let cases = ImageSyncUseCases::new(fixture.store.clone(), fixture.store.clone(), stalled);
    let error = cases.clean_orphans(true).await.unwrap_err();
    drop(held);

    assert!(matches!(error, ReconcileError::BackupFailed { .. }), "{error:?}");
    assert!(fixture.store.list_backups(10).await.unwrap().is_empty());
    assert_eq!(fixture.store.fetch_central_mapping().await.unwrap().len(), 3);
}
