//! Test helper utilities
//!
//! Shared fixtures for tagbatch-engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tagbatch_engine::models::{Record, RecordStore};
use tagbatch_engine::services::{MetadataWriter, WriteError};
use tempfile::TempDir;
use tokio::sync::Notify;

/// One recorded writer invocation
#[derive(Debug, Clone)]
pub struct WriterCall {
    pub file_name: String,
    pub args: Vec<OsString>,
}

/// In-process writer that tracks concurrency instead of running exiftool
pub struct FakeWriter {
    delay: Duration,
    fail_on: HashSet<String>,
    active: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<WriterCall>>,
    started: Notify,
}

impl FakeWriter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_on: HashSet::new(),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            started: Notify::new(),
        }
    }

    /// Resolves once a call has started (immediately if one already has)
    pub async fn call_started(&self) {
        self.started.notified().await;
    }

    /// Fail every call whose target has this file name
    pub fn failing_on(mut self, file_name: &str) -> Self {
        self.fail_on.insert(file_name.to_string());
        self
    }

    /// Highest number of simultaneous calls seen
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<WriterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_for(&self, file_name: &str) -> Option<WriterCall> {
        self.calls().into_iter().find(|c| c.file_name == file_name)
    }
}

#[async_trait]
impl MetadataWriter for FakeWriter {
    fn name(&self) -> &str {
        "fake"
    }

    async fn write(&self, args: &[OsString], target: &Path) -> Result<String, WriteError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();

        tokio::time::sleep(self.delay).await;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(WriterCall {
            file_name: file_name.clone(),
            args: args.to_vec(),
        });
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.contains(&file_name) {
            return Err(WriteError::Failed {
                code: Some(1),
                stderr: "Error: Not a valid TIFF".to_string(),
            });
        }
        Ok("1 image files updated".to_string())
    }
}

/// Temp directory holding empty files with the given names
pub fn image_dir(names: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    dir
}

/// Record store from `(key, [(field, value)])` pairs
pub fn store(rows: &[(&str, &[(&str, &str)])]) -> RecordStore {
    rows.iter()
        .map(|(key, fields)| {
            let fields: IndexMap<String, Option<String>> = fields
                .iter()
                .map(|(f, v)| (f.to_string(), Some(v.to_string())))
                .collect();
            Record::new(*key, fields)
        })
        .collect()
}
