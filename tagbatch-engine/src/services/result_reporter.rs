//! Collects per-file outcomes and publishes run progress
//!
//! Event order for one run:
//! 1. `TotalQueued` (once, before dispatch)
//! 2. `ItemCompleted` per dispatched or skipped job, in completion order
//! 3. `ItemCompleted` per unmatched file, in enumeration order
//! 4. `RunCompleted` (exactly once)

use crate::models::{DiscoveredFile, Outcome, RunResult};
use std::time::Instant;
use tagbatch_common::events::{EventSender, RunEvent};
use tracing::{info, warn};
use uuid::Uuid;

pub struct ResultReporter {
    run_id: Uuid,
    events: EventSender,
    result: RunResult,
    started: Instant,
    total_announced: bool,
}

impl ResultReporter {
    pub fn new(run_id: Uuid, events: EventSender) -> Self {
        Self {
            run_id,
            events,
            result: RunResult::new(run_id, 0),
            started: Instant::now(),
            total_announced: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Outcomes collected so far
    pub fn result(&self) -> &RunResult {
        &self.result
    }

    /// Publish the queue size; later calls are ignored
    pub fn announce_total(&mut self, total: usize, unmatched: usize) {
        if self.total_announced {
            warn!(run_id = %self.run_id, "Total already announced, ignoring");
            return;
        }
        self.total_announced = true;
        self.result.queued = total;

        info!(run_id = %self.run_id, total, unmatched, "Jobs queued");
        self.events.emit_lossy(RunEvent::TotalQueued {
            run_id: self.run_id,
            total,
            unmatched,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Record one file's terminal outcome
    pub fn report(&mut self, file_name: String, outcome: Outcome) {
        match &outcome {
            Outcome::Failed(reason) => warn!(file = %file_name, reason = %reason, "Write failed"),
            other => info!(file = %file_name, outcome = %other, "File done"),
        }

        let text = outcome.to_string();
        let kind = outcome.kind();
        self.result.push(file_name.clone(), outcome);

        self.events.emit_lossy(RunEvent::ItemCompleted {
            run_id: self.run_id,
            file_name,
            outcome: text,
            kind,
            processed: self.result.processed,
            total: self.result.queued,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Report unmatched files and close the run
    pub fn finish(mut self, unmatched: &[DiscoveredFile]) -> RunResult {
        for file in unmatched {
            self.report(file.file_name(), Outcome::NotFound);
        }

        self.result.duration = self.started.elapsed();
        let result = self.result;

        info!(
            run_id = %self.run_id,
            written = result.written(),
            failed = result.failed(),
            unmatched = result.unmatched(),
            skipped = result.skipped(),
            duration_ms = result.duration.as_millis() as u64,
            "Run complete"
        );

        self.events.emit_lossy(RunEvent::RunCompleted {
            run_id: self.run_id,
            written: result.written(),
            failed: result.failed(),
            unmatched: result.unmatched(),
            skipped: result.skipped(),
            duration_ms: result.duration.as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        result
    }
}
