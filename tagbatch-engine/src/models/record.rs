//! Metadata records keyed by normalized identifier
//!
//! A `RecordStore` is built once per data-source load and only read during a
//! run. Keys are trimmed and stripped of an image extension; rows whose key
//! normalizes to nothing are purged, so no empty key ever survives loading.

use crate::models::work_item::is_accepted_extension;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Raw rows as produced by a data source: key → (field → value)
pub type RawRecords = IndexMap<String, IndexMap<String, Option<String>>>;

/// One row of metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Normalized record key
    pub key: String,
    /// Logical field name → value, in data-source order
    pub fields: IndexMap<String, Option<String>>,
}

impl Record {
    pub fn new(key: impl Into<String>, fields: IndexMap<String, Option<String>>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    /// Value of a field, or `None` when absent or blank
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Immutable key → record mapping
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: IndexMap<String, Arc<Record>>,
}

impl RecordStore {
    /// Build a store from raw data-source rows
    ///
    /// Later duplicates replace earlier rows with the same normalized key.
    pub fn from_raw(raw: RawRecords) -> Self {
        let mut records = IndexMap::with_capacity(raw.len());
        let mut purged = 0usize;

        for (raw_key, fields) in raw {
            let Some(key) = Self::normalize_key(&raw_key) else {
                purged += 1;
                continue;
            };

            if records.contains_key(&key) {
                warn!(key = %key, "Duplicate record key, later row replaces earlier one");
            }
            let record = Arc::new(Record::new(key.clone(), fields));
            records.insert(key, record);
        }

        if purged > 0 {
            debug!(purged, "Purged records with empty keys");
        }

        Self { records }
    }

    /// Normalize a raw key: trim whitespace and drop an image extension
    ///
    /// Returns `None` for keys that end up empty.
    pub fn normalize_key(raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        let stem = match trimmed.rsplit_once('.') {
            Some((stem, ext)) if is_accepted_extension(ext) => stem.trim_end(),
            _ => trimmed,
        };

        if stem.is_empty() {
            None
        } else {
            Some(stem.to_string())
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Record>> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Keys in load order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<Record> for RecordStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let raw: RawRecords = iter.into_iter().map(|r| (r.key, r.fields)).collect();
        Self::from_raw(raw)
    }
}
