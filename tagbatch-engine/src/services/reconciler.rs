//! Joins discovered files against the record store
//!
//! Produces the work queue for the dispatch engine and, separately, the files
//! no record matched. Unmatched files never enter the queue. Input order is
//! kept in both outputs.

use crate::models::{DiscoveredFile, RecordStore, WorkItem};
use crate::services::name_matcher::NameMatcher;
use tracing::debug;

/// Work queue plus the files left without a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub queue: Vec<WorkItem>,
    pub unmatched: Vec<DiscoveredFile>,
}

impl Reconciliation {
    /// Files accounted for (queued + unmatched)
    pub fn total_files(&self) -> usize {
        self.queue.len() + self.unmatched.len()
    }
}

/// Pair every file with its record
///
/// With `update_from_store` false, or without a store, every file is queued
/// without a record (record-free mode).
pub fn reconcile(
    files: Vec<DiscoveredFile>,
    store: Option<&RecordStore>,
    matcher: &NameMatcher,
    update_from_store: bool,
) -> Reconciliation {
    let store = match store {
        Some(store) if update_from_store => store,
        _ => {
            return Reconciliation {
                queue: files.into_iter().map(WorkItem::record_free).collect(),
                unmatched: Vec::new(),
            };
        }
    };

    let mut result = Reconciliation::default();

    for file in files {
        let hit = matcher
            .find_match(&file.base_name, store.keys())
            .and_then(|key| store.get(key))
            .cloned();

        match hit {
            Some(record) => {
                debug!(file = %file.file_name(), key = %record.key, "Matched record");
                result.queue.push(WorkItem::matched(file, record));
            }
            None => {
                debug!(file = %file.file_name(), "No record for file");
                result.unmatched.push(file);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use indexmap::IndexMap;

    fn files(names: &[&str]) -> Vec<DiscoveredFile> {
        names
            .iter()
            .map(|n| DiscoveredFile::from_path(format!("/img/{}", n)).unwrap())
            .collect()
    }

    fn store(keys: &[&str]) -> RecordStore {
        keys.iter()
            .map(|k| Record::new(*k, IndexMap::new()))
            .collect()
    }

    #[test]
    fn test_page_scans_match_one_record() {
        let matcher = NameMatcher::new(&[], true).unwrap();
        let store = store(&["A", "C"]);
        let result = reconcile(files(&["A01.tif", "A02.tif", "B99.tif"]), Some(&store), &matcher, true);

        let queued: Vec<(String, String)> = result
            .queue
            .iter()
            .map(|w| (w.file.file_name(), w.record.as_ref().unwrap().key.clone()))
            .collect();
        assert_eq!(
            queued,
            vec![
                ("A01.tif".to_string(), "A".to_string()),
                ("A02.tif".to_string(), "A".to_string()),
            ]
        );
        assert_eq!(result.unmatched.len(), 1);
        assert_eq!(result.unmatched[0].file_name(), "B99.tif");
        assert_eq!(result.total_files(), 3);
    }

    #[test]
    fn test_record_free_mode_queues_everything() {
        let matcher = NameMatcher::new(&[], false).unwrap();
        let store = store(&["A"]);
        let result = reconcile(files(&["A.tif", "Z.tif"]), Some(&store), &matcher, false);

        assert_eq!(result.queue.len(), 2);
        assert!(result.queue.iter().all(|w| w.record.is_none()));
        assert!(result.unmatched.is_empty());
    }

    #[test]
    fn test_missing_store_is_record_free() {
        let matcher = NameMatcher::new(&[], false).unwrap();
        let result = reconcile(files(&["A.tif"]), None, &matcher, true);
        assert_eq!(result.queue.len(), 1);
        assert!(result.queue[0].record.is_none());
    }

    #[test]
    fn test_input_order_preserved() {
        let matcher = NameMatcher::new(&[], false).unwrap();
        let store = store(&["A", "B", "C"]);
        let result = reconcile(
            files(&["C.tif", "X.tif", "A.tif", "Y.tif", "B.tif"]),
            Some(&store),
            &matcher,
            true,
        );

        let queued: Vec<String> = result.queue.iter().map(|w| w.file.file_name()).collect();
        let unmatched: Vec<String> = result.unmatched.iter().map(|f| f.file_name()).collect();
        assert_eq!(queued, vec!["C.tif", "A.tif", "B.tif"]);
        assert_eq!(unmatched, vec!["X.tif", "Y.tif"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let matcher = NameMatcher::new(&["_VERSO?$".to_string()], true).unwrap();
        let store = store(&["Page", "A"]);
        let input = files(&["Page_VERSO.tif", "A01.jpg", "Q.tif"]);

        let first = reconcile(input.clone(), Some(&store), &matcher, true);
        let second = reconcile(input, Some(&store), &matcher, true);
        assert_eq!(first, second);
    }
}
