//! image-reconciler - central image mapping reconciliation
//!
//! Compares a central `{id: url}` image mapping against per-product image
//! fields, reports drift, removes orphan mapping keys behind a backup, and
//! samples image URLs for reachability.

// Module declarations
pub mod application;
pub mod commands;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;
