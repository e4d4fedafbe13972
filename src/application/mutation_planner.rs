//! Orphan cleanup planning and the backup-then-write executor
//!
//! A plan is computed from a snapshot and applied at most once. Applying is a
//! two-phase protocol: the backup document must be acknowledged before the
//! corrective write is issued, and a failed backup stops the run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{error, info, warn};

use crate::application::errors::{ReconcileError, ReconcileResult};
use crate::domain::image_record::CentralMapping;
use crate::domain::repositories::{MappingBackup, MappingWriteRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationMode {
    DryRun,
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationPlan {
    pub mode: MutationMode,
    /// Mapping as read, written verbatim to the backup document.
    pub backup_snapshot: CentralMapping,
    pub keys_to_remove: BTreeSet<String>,
    pub resulting_mapping: CentralMapping,
}

impl MutationPlan {
    pub fn removal_count(&self) -> usize {
        self.keys_to_remove.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationDecision {
    /// No orphan keys: no backup and no corrective write.
    NoOp,
    Planned(MutationPlan),
}

/// Result of running a decision against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MutationOutcome {
    NoOp,
    #[serde(rename_all = "camelCase")]
    DryRun { would_remove: Vec<String> },
    #[serde(rename_all = "camelCase")]
    Applied {
        backup_id: String,
        removed: Vec<String>,
    },
}

/// Compute the corrected mapping with every orphan key removed.
///
/// Keys that are not in the mapping are ignored; if nothing remains to remove
/// the decision is [`MutationDecision::NoOp`].
pub fn plan_mutation(mapping: &CentralMapping, orphan_keys: &[String], apply: bool) -> MutationDecision {
    let keys_to_remove: BTreeSet<String> = orphan_keys
        .iter()
        .filter(|key| mapping.contains_key(key.as_str()))
        .cloned()
        .collect();

    if keys_to_remove.is_empty() {
        return MutationDecision::NoOp;
    }

    let mut resulting_mapping = mapping.clone();
    for key in &keys_to_remove {
        resulting_mapping.remove(key);
    }

    MutationDecision::Planned(MutationPlan {
        mode: if apply { MutationMode::Apply } else { MutationMode::DryRun },
        backup_snapshot: mapping.clone(),
        keys_to_remove,
        resulting_mapping,
    })
}

/// Run a decision. Phase 1 commits the backup, phase 2 the corrected mapping.
pub async fn execute_plan(
    decision: MutationDecision,
    writer: &dyn MappingWriteRepository,
) -> ReconcileResult<MutationOutcome> {
    let plan = match decision {
        MutationDecision::NoOp => {
            info!("No orphan keys, nothing to write");
            return Ok(MutationOutcome::NoOp);
        }
        MutationDecision::Planned(plan) => plan,
    };

    let keys: Vec<String> = plan.keys_to_remove.iter().cloned().collect();

    if plan.mode == MutationMode::DryRun {
        info!(would_remove = keys.len(), "Dry run, store left untouched");
        return Ok(MutationOutcome::DryRun { would_remove: keys });
    }

    let backup = MappingBackup {
        images: plan.backup_snapshot,
        backed_up_at: Utc::now(),
        orphan_keys: plan.keys_to_remove,
    };

    let backup_id = match writer.write_backup(&backup).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Backup write failed, corrective write not attempted");
            return Err(ReconcileError::backup_failed(&e));
        }
    };
    info!(backup_id = %backup_id, keys = backup.images.len(), "💾 Backup committed");

    if let Err(e) = writer.write_corrected_mapping(&plan.resulting_mapping).await {
        warn!(backup_id = %backup_id, error = %e, "Corrective write failed after backup");
        return Err(ReconcileError::write_failed(&backup_id, &e));
    }

    info!(
        backup_id = %backup_id,
        removed = keys.len(),
        remaining = plan.resulting_mapping.len(),
        "✅ Orphan keys removed from central mapping"
    );

    Ok(MutationOutcome::Applied {
        backup_id,
        removed: keys,
    })
}
