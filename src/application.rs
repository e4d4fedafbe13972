//! Application layer module
//!
//! This module contains the reconciliation engine, the mutation planner, the
//! reachability prober and the use cases that orchestrate them.

pub mod errors;
pub mod mutation_planner;
pub mod reachability;
pub mod reconciliation;
pub mod use_cases;

pub use errors::{ReconcileError, ReconcileResult, StoreState};
pub use mutation_planner::{execute_plan, plan_mutation, MutationDecision, MutationMode, MutationOutcome, MutationPlan};
pub use reachability::{probe_sample, ProbeError, ProbeOutcome, ProbeResponse, ProbeResult, ProbeSummary, UrlProbe};
pub use reconciliation::{orphan_keys, reconcile, scan_partials, ReconciliationReport};
pub use use_cases::{AuditSnapshot, CleanupSummary, ImageSyncUseCases, ProbeSource};
