//! Image records shared by the reconciliation engine and the mutation planner
//!
//! Both sources are modelled as explicit snapshots: the central mapping document
//! (product id -> image URL) and the product documents with their embedded
//! image field. Adapters drop every other document field before these types
//! are built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Snapshot of the central id -> image URL mapping document.
///
/// Backed by a `BTreeMap` so iteration, serialization and backups are
/// deterministic regardless of how the store returned the keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CentralMapping {
    images: BTreeMap<String, String>,
}

impl CentralMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL for `id`, treating an empty string as absent.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.images
            .get(id)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.images.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, url: impl Into<String>) -> Option<String> {
        self.images.insert(id.into(), url.into())
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.images.remove(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// `(id, url)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.images.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.images
    }
}

impl From<BTreeMap<String, String>> for CentralMapping {
    fn from(images: BTreeMap<String, String>) -> Self {
        Self { images }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CentralMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            images: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One product document as the engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, image: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: image.map(str::to_string),
        }
    }

    /// Embedded image URL, treating an empty string as absent.
    pub fn image_url(&self) -> Option<&str> {
        self.image.as_deref().filter(|url| !url.is_empty())
    }
}

/// Transient join of both sources for a single product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: String,
    pub central_url: Option<String>,
    pub product_url: Option<String>,
}

impl ImageRecord {
    pub fn verdict(&self) -> ConsistencyVerdict {
        ConsistencyVerdict::classify(self.central_url.as_deref(), self.product_url.as_deref())
    }
}

/// Consistency state of a single product id across both sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsistencyVerdict {
    Same,
    Different,
    CentralMissing,
    ProductMissing,
    BothMissing,
}

impl ConsistencyVerdict {
    /// Exact, case-sensitive comparison. No URL normalization is applied.
    pub fn classify(central_url: Option<&str>, product_url: Option<&str>) -> Self {
        match (central_url, product_url) {
            (None, None) => Self::BothMissing,
            (Some(_), None) => Self::ProductMissing,
            (None, Some(_)) => Self::CentralMissing,
            (Some(central), Some(product)) if central == product => Self::Same,
            (Some(_), Some(_)) => Self::Different,
        }
    }

    pub fn is_drift(self) -> bool {
        self != Self::Same
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Different => "different",
            Self::CentralMissing => "central_missing",
            Self::ProductMissing => "product_missing",
            Self::BothMissing => "both_missing",
        }
    }
}

impl fmt::Display for ConsistencyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible unit of drift. Never built for `Same`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub id: String,
    pub verdict: ConsistencyVerdict,
    pub central_url: Option<String>,
    pub product_url: Option<String>,
}

impl DiffEntry {
    /// Returns `None` when the record is consistent.
    pub fn from_record(record: ImageRecord) -> Option<Self> {
        let verdict = record.verdict();
        verdict.is_drift().then(|| Self {
            id: record.id,
            verdict,
            central_url: record.central_url,
            product_url: record.product_url,
        })
    }
}
