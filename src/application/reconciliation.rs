//! Reconciliation engine
//!
//! Pure, single-pass comparison of two already-fetched snapshots. Every distinct
//! product id observed in either source is classified exactly once.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::domain::image_record::{
    CentralMapping, ConsistencyVerdict, DiffEntry, ImageRecord, ProductRecord,
};
use crate::domain::url_validator::{PartialRecord, UrlSide};

/// Classified drift between the central mapping and the product documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    /// Product-driven entries in input order, followed by orphan keys in key order.
    pub entries: Vec<DiffEntry>,
    pub same_count: usize,
    pub diff_count: usize,
    pub missing_in_central: usize,
    pub missing_in_product: usize,
    /// Mapping keys with no product document, ascending.
    pub orphan_keys: Vec<String>,
    pub mapping_size: usize,
    pub product_count: usize,
}

impl ReconciliationReport {
    fn record(&mut self, record: ImageRecord) {
        match record.verdict() {
            ConsistencyVerdict::Same => self.same_count += 1,
            ConsistencyVerdict::Different => self.diff_count += 1,
            ConsistencyVerdict::CentralMissing => self.missing_in_central += 1,
            ConsistencyVerdict::ProductMissing => self.missing_in_product += 1,
            // Counted on both sides, matching the historical report.
            ConsistencyVerdict::BothMissing => {
                self.missing_in_central += 1;
                self.missing_in_product += 1;
            }
        }

        if let Some(entry) = DiffEntry::from_record(record) {
            self.entries.push(entry);
        }
    }

    /// Number of distinct ids across both sources.
    pub fn distinct_ids(&self) -> usize {
        self.same_count + self.entries.len()
    }

    pub fn has_drift(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn entries_with(&self, verdict: ConsistencyVerdict) -> impl Iterator<Item = &DiffEntry> {
        self.entries.iter().filter(move |entry| entry.verdict == verdict)
    }

    pub fn count_of(&self, verdict: ConsistencyVerdict) -> usize {
        match verdict {
            ConsistencyVerdict::Same => self.same_count,
            other => self.entries_with(other).count(),
        }
    }

    /// Share of mapping keys that are orphaned, 0.0 for an empty mapping.
    pub fn orphan_ratio(&self) -> f64 {
        if self.mapping_size == 0 {
            0.0
        } else {
            self.orphan_keys.len() as f64 / self.mapping_size as f64
        }
    }
}

/// Classify every product against the central mapping and collect orphan keys.
pub fn reconcile(mapping: &CentralMapping, products: &[ProductRecord]) -> ReconciliationReport {
    let mut report = ReconciliationReport {
        mapping_size: mapping.len(),
        ..ReconciliationReport::default()
    };

    let mut seen: HashSet<&str> = HashSet::with_capacity(products.len());
    for product in products {
        if !seen.insert(product.id.as_str()) {
            warn!(id = %product.id, "Duplicate product id skipped");
            continue;
        }

        report.record(ImageRecord {
            id: product.id.clone(),
            central_url: mapping.get(&product.id).map(str::to_string),
            product_url: product.image_url().map(str::to_string),
        });
    }
    report.product_count = seen.len();

    let orphans = orphan_keys(mapping, products);
    for key in &orphans {
        report.record(ImageRecord {
            id: key.clone(),
            central_url: mapping.get(key).map(str::to_string),
            product_url: None,
        });
    }
    report.orphan_keys = orphans;

    debug!(
        same = report.same_count,
        different = report.diff_count,
        missing_in_central = report.missing_in_central,
        missing_in_product = report.missing_in_product,
        orphans = report.orphan_keys.len(),
        "Reconciliation pass finished"
    );

    report
}

/// Mapping keys with no product document, computed over the full key set.
pub fn orphan_keys(mapping: &CentralMapping, products: &[ProductRecord]) -> Vec<String> {
    let product_ids: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
    mapping
        .keys()
        .filter(|key| !product_ids.contains(key))
        .map(str::to_string)
        .collect()
}

/// Values present in one source that fail the URL validator.
///
/// Products are scanned in input order, then mapping keys with no product.
pub fn scan_partials(mapping: &CentralMapping, products: &[ProductRecord]) -> Vec<PartialRecord> {
    let mut partials = Vec::new();
    let mut seen: HashSet<&str> = HashSet::with_capacity(products.len());

    for product in products {
        if !seen.insert(product.id.as_str()) {
            continue;
        }
        partials.extend(PartialRecord::check(&product.id, UrlSide::Central, mapping.get(&product.id)));
        partials.extend(PartialRecord::check(&product.id, UrlSide::Product, product.image_url()));
    }

    for (id, url) in mapping.iter().filter(|(id, _)| !seen.contains(id)) {
        partials.extend(PartialRecord::check(id, UrlSide::Central, Some(url).filter(|u| !u.is_empty())));
    }

    partials
}
