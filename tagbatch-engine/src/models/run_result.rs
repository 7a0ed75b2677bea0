//! Per-file outcomes and the accumulated result of a run

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tagbatch_common::events::OutcomeKind;
use uuid::Uuid;

/// Marker reported for files without a matching record
pub const NOT_FOUND_MARKER: &str = "WARNING: image file not found in data source";

/// Prefix of every failure outcome
pub const FAILED_MARKER: &str = "FAILED";

/// Marker reported for files left in the queue by a stopped run
pub const SKIPPED_MARKER: &str = "SKIPPED: run stopped before this file was dispatched";

/// Terminal outcome of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Writer succeeded; carries its decoded output
    Written(String),
    /// Writer failed; carries the failure description
    Failed(String),
    /// No record matched the file
    NotFound,
    /// Never dispatched because the run was stopped
    Skipped,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Written(_) => OutcomeKind::Written,
            Outcome::Failed(_) => OutcomeKind::Failed,
            Outcome::NotFound => OutcomeKind::NotFound,
            Outcome::Skipped => OutcomeKind::Skipped,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Written(output) => f.write_str(output),
            Outcome::Failed(reason) => write!(f, "{}: {}", FAILED_MARKER, reason),
            Outcome::NotFound => f.write_str(NOT_FOUND_MARKER),
            Outcome::Skipped => f.write_str(SKIPPED_MARKER),
        }
    }
}

/// A file name with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub file_name: String,
    pub outcome: Outcome,
}

/// Everything a run reported, in emission order
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Jobs queued for the writer
    pub queued: usize,
    /// Queued jobs that reached an outcome (written or failed)
    pub processed: usize,
    pub entries: Vec<FileOutcome>,
    pub duration: Duration,
}

impl RunResult {
    pub fn new(run_id: Uuid, queued: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            queued,
            processed: 0,
            entries: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub(crate) fn push(&mut self, file_name: String, outcome: Outcome) {
        if matches!(outcome, Outcome::Written(_) | Outcome::Failed(_)) {
            self.processed += 1;
        }
        self.entries.push(FileOutcome { file_name, outcome });
    }

    /// Number of per-file entries (equals the number of discovered files once finished)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.kind() == kind)
            .count()
    }

    pub fn written(&self) -> usize {
        self.count(OutcomeKind::Written)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeKind::Failed)
    }

    pub fn unmatched(&self) -> usize {
        self.count(OutcomeKind::NotFound)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeKind::Skipped)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Outcome reported for a file name, if any
    pub fn outcome_for(&self, file_name: &str) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|e| e.file_name == file_name)
            .map(|e| &e.outcome)
    }
}
