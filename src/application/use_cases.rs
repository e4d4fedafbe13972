//! Application use cases for image mapping reconciliation
//!
//! Joins the two independent source reads, runs the engine on the snapshots
//! and drives the mutation planner. Nothing here talks to a concrete store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::application::errors::{ReconcileError, ReconcileResult};
use crate::application::mutation_planner::{execute_plan, plan_mutation, MutationOutcome};
use crate::application::reconciliation::{reconcile, scan_partials, ReconciliationReport};
use crate::domain::image_record::{CentralMapping, ProductRecord};
use crate::domain::repositories::{ImageMappingRepository, MappingWriteRepository, ProductRepository};
use crate::domain::url_validator::PartialRecord;

pub const MAPPING_SOURCE: &str = "central_mapping";
pub const PRODUCTS_SOURCE: &str = "products";

/// Snapshots of both sources plus everything derived from them.
#[derive(Debug, Clone)]
pub struct AuditSnapshot {
    pub mapping: CentralMapping,
    pub products: Vec<ProductRecord>,
    pub report: ReconciliationReport,
    pub partials: Vec<PartialRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub report: ReconciliationReport,
    pub outcome: MutationOutcome,
}

/// Where the probe command takes its `(id, url)` pairs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeSource {
    Mapping,
    Products,
}

pub struct ImageSyncUseCases {
    mapping_repo: Arc<dyn ImageMappingRepository>,
    product_repo: Arc<dyn ProductRepository>,
    mapping_writer: Arc<dyn MappingWriteRepository>,
}

impl ImageSyncUseCases {
    pub fn new(
        mapping_repo: Arc<dyn ImageMappingRepository>,
        product_repo: Arc<dyn ProductRepository>,
        mapping_writer: Arc<dyn MappingWriteRepository>,
    ) -> Self {
        Self {
            mapping_repo,
            product_repo,
            mapping_writer,
        }
    }

    /// Fetch both sources concurrently; both must succeed.
    pub async fn load_sources(&self) -> ReconcileResult<(CentralMapping, Vec<ProductRecord>)> {
        let (mapping, products) = tokio::join!(
            self.mapping_repo.fetch_central_mapping(),
            self.product_repo.fetch_all_products()
        );

        let mapping = mapping.map_err(|e| ReconcileError::from_read(MAPPING_SOURCE, e))?;
        let products = products.map_err(|e| ReconcileError::SourceUnavailable {
            source_name: PRODUCTS_SOURCE.to_string(),
            reason: e.to_string(),
        })?;

        info!(mapping_keys = mapping.len(), products = products.len(), "Loaded image sources");
        Ok((mapping, products))
    }

    pub async fn audit(&self) -> ReconcileResult<AuditSnapshot> {
        let (mapping, products) = self.load_sources().await?;
        let report = reconcile(&mapping, &products);
        let partials = scan_partials(&mapping, &products);

        info!(
            same = report.same_count,
            different = report.diff_count,
            missing_in_central = report.missing_in_central,
            missing_in_product = report.missing_in_product,
            orphans = report.orphan_keys.len(),
            partials = partials.len(),
            "📊 Reconciliation completed"
        );

        Ok(AuditSnapshot {
            mapping,
            products,
            report,
            partials,
        })
    }

    /// Remove orphan keys from the central mapping, or only plan it when
    /// `apply` is false.
    pub async fn clean_orphans(&self, apply: bool) -> ReconcileResult<CleanupSummary> {
        let snapshot = self.audit().await?;
        let decision = plan_mutation(&snapshot.mapping, &snapshot.report.orphan_keys, apply);
        let outcome = execute_plan(decision, self.mapping_writer.as_ref()).await?;

        Ok(CleanupSummary {
            report: snapshot.report,
            outcome,
        })
    }

    /// `(id, url)` pairs to probe, in mapping key order or product order.
    pub async fn probe_targets(&self, source: ProbeSource) -> ReconcileResult<Vec<(String, String)>> {
        let pairs = match source {
            ProbeSource::Mapping => self
                .mapping_repo
                .fetch_central_mapping()
                .await
                .map_err(|e| ReconcileError::from_read(MAPPING_SOURCE, e))?
                .iter()
                .filter(|(_, url)| !url.is_empty())
                .map(|(id, url)| (id.to_string(), url.to_string()))
                .collect(),
            ProbeSource::Products => self
                .product_repo
                .fetch_all_products()
                .await
                .map_err(|e| ReconcileError::SourceUnavailable {
                    source_name: PRODUCTS_SOURCE.to_string(),
                    reason: e.to_string(),
                })?
                .into_iter()
                .filter_map(|product| {
                    let url = product.image_url()?.to_string();
                    Some((product.id, url))
                })
                .collect(),
        };
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image_record::ConsistencyVerdict;
    use crate::test_utils::InMemoryStore;

    fn use_cases(store: &Arc<InMemoryStore>) -> ImageSyncUseCases {
        ImageSyncUseCases::new(store.clone(), store.clone(), store.clone())
    }

    fn seeded_store() -> InMemoryStore {
        InMemoryStore::new(
            [("A", "http://x/1.png"), ("B", "http://x/2.png")].into_iter().collect(),
            vec![
                ProductRecord::new("A", "Lamp", Some("http://x/1.png")),
                ProductRecord::new("C", "Chair", Some("http://x/3.png")),
            ],
        )
    }

    #[tokio::test]
    async fn test_audit_classifies_sources() {
        let store = Arc::new(seeded_store());
        let snapshot = use_cases(&store).audit().await.unwrap();

        assert_eq!(snapshot.report.same_count, 1);
        assert_eq!(snapshot.report.orphan_keys, vec!["B".to_string()]);
        assert_eq!(snapshot.report.count_of(ConsistencyVerdict::CentralMissing), 1);
    }

    #[tokio::test]
    async fn test_missing_mapping_document_is_fatal() {
        let store = Arc::new(InMemoryStore::without_mapping(vec![ProductRecord::new("A", "Lamp", None)]));
        let error = use_cases(&store).audit().await.unwrap_err();
        assert!(matches!(error, ReconcileError::MappingNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unavailable_products_produce_no_report() {
        let store = Arc::new(seeded_store().with_products_unavailable());
        let error = use_cases(&store).audit().await.unwrap_err();
        match error {
            ReconcileError::SourceUnavailable { source_name, .. } => assert_eq!(source_name, PRODUCTS_SOURCE),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_second_cleanup_is_noop() {
        let store = Arc::new(seeded_store());
        let cases = use_cases(&store);

        let first = cases.clean_orphans(true).await.unwrap();
        assert!(matches!(first.outcome, MutationOutcome::Applied { .. }));

        let second = cases.clean_orphans(true).await.unwrap();
        assert_eq!(second.outcome, MutationOutcome::NoOp);
        assert_eq!(store.backup_count(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_mapping_untouched() {
        let store = Arc::new(seeded_store());
        let summary = use_cases(&store).clean_orphans(false).await.unwrap();

        assert!(matches!(summary.outcome, MutationOutcome::DryRun { .. }));
        assert_eq!(store.current_mapping().map(|m| m.len()), Some(2));
        assert_eq!(store.backup_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_targets_skip_missing_images() {
        let store = Arc::new(InMemoryStore::new(
            CentralMapping::new(),
            vec![
                ProductRecord::new("A", "Lamp", Some("http://x/1.png")),
                ProductRecord::new("B", "Chair", None),
            ],
        ));
        let pairs = use_cases(&store).probe_targets(ProbeSource::Products).await.unwrap();
        assert_eq!(pairs, vec![("A".to_string(), "http://x/1.png".to_string())]);
    }
}
