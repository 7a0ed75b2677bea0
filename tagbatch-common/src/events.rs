//! Run event types
//!
//! A run pushes events to its caller as they happen. Every discovered file
//! produces exactly one `ItemCompleted`; `RunCompleted` is always last.
//!
//! Unlike a broadcast bus, the channel here is unbounded and lossless: the
//! one-outcome-per-file guarantee must survive a slow consumer.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outcome category of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Writer ran and reported success
    Written,
    /// Writer could not be started or exited non-zero
    Failed,
    /// No record in the data source matched the file
    NotFound,
    /// Run was stopped before the file was dispatched
    Skipped,
}

impl OutcomeKind {
    pub fn is_failure(self) -> bool {
        matches!(self, OutcomeKind::Failed)
    }
}

/// Events emitted during a tagging run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunEvent {
    /// Run accepted its inputs and is about to dispatch
    RunStarted {
        run_id: Uuid,
        /// Directory being processed
        directory: String,
        /// Effective writer concurrency
        concurrency: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Emitted once, before the first job starts
    ///
    /// `total` counts queued jobs only; unmatched files are reported after
    /// the queue drains.
    TotalQueued {
        run_id: Uuid,
        total: usize,
        unmatched: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One file reached its terminal outcome
    ItemCompleted {
        run_id: Uuid,
        file_name: String,
        /// Human readable outcome (writer output or failure marker)
        outcome: String,
        kind: OutcomeKind,
        /// Queued jobs finished so far
        processed: usize,
        /// Queued jobs in this run
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Terminal event, emitted exactly once per run
    RunCompleted {
        run_id: Uuid,
        written: usize,
        failed: usize,
        unmatched: usize,
        skipped: usize,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::TotalQueued { run_id, .. }
            | RunEvent::ItemCompleted { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. } => *run_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::RunCompleted { .. })
    }
}

/// Sending half of a run's event channel
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<RunEvent>,
}

/// Receiving half of a run's event channel
pub type EventReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Create a lossless event channel for one run
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

impl EventSender {
    /// Emit an event
    ///
    /// Returns `Err` when the receiver has been dropped.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: RunEvent) -> Result<(), mpsc::error::SendError<RunEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring a dropped receiver
    ///
    /// A caller that stops listening does not stop the run.
    pub fn emit_lossy(&self, event: RunEvent) {
        let _ = self.tx.send(event);
    }

    /// True once the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
