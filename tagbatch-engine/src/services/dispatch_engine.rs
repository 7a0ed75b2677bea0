//! Bounded-concurrency writer dispatch
//!
//! The coordinator keeps at most `concurrency` writer jobs in flight. Each
//! completion is reported immediately and frees a slot for the next queued
//! item, so the queue drains without any polling interval.
//!
//! **State machine:** Idle → Dispatching → Draining → Finished
//!
//! Stopping is cooperative: jobs already running are awaited, jobs never
//! launched are reported as skipped.

use crate::models::{DiscoveredFile, Outcome, RunResult, WorkItem};
use crate::services::command_builder::CommandBuilder;
use crate::services::exif_writer::MetadataWriter;
use crate::services::result_reporter::ResultReporter;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Dispatch lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing started yet
    Idle,
    /// Launching jobs as slots free up
    Dispatching,
    /// No more launches; waiting for in-flight jobs
    Draining,
    /// Every job reported
    Finished,
}

/// Runs writer jobs for a work queue
pub struct DispatchEngine {
    writer: Arc<dyn MetadataWriter>,
    builder: CommandBuilder,
    concurrency: usize,
    state: DispatchState,
}

impl DispatchEngine {
    /// `concurrency` below 1 is raised to 1
    pub fn new(writer: Arc<dyn MetadataWriter>, builder: CommandBuilder, concurrency: usize) -> Self {
        Self {
            writer,
            builder,
            concurrency: concurrency.max(1),
            state: DispatchState::Idle,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Dispatch every queued item, then report unmatched files
    ///
    /// Consumes the reporter; the returned result holds one entry per queued
    /// and unmatched file.
    pub async fn run(
        &mut self,
        queue: Vec<WorkItem>,
        unmatched: Vec<DiscoveredFile>,
        mut reporter: ResultReporter,
        stop: CancellationToken,
    ) -> RunResult {
        reporter.announce_total(queue.len(), unmatched.len());

        let mut queue: VecDeque<WorkItem> = queue.into();
        let mut in_flight = FuturesUnordered::new();

        self.transition(DispatchState::Dispatching);

        loop {
            // Fill free slots
            while in_flight.len() < self.concurrency && !stop.is_cancelled() {
                let Some(item) = queue.pop_front() else {
                    break;
                };
                in_flight.push(self.launch(&item));
                debug!(
                    file = %item.file.file_name(),
                    in_flight = in_flight.len(),
                    queued = queue.len(),
                    "Writer job started"
                );
            }

            if self.state == DispatchState::Dispatching && (queue.is_empty() || stop.is_cancelled()) {
                self.transition(DispatchState::Draining);
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                Some((file_name, outcome)) = in_flight.next() => {
                    reporter.report(file_name, outcome);
                }
                _ = stop.cancelled(), if self.state == DispatchState::Dispatching => {
                    info!(
                        in_flight = in_flight.len(),
                        queued = queue.len(),
                        "Stop requested, waiting for running jobs"
                    );
                }
            }
        }

        if !queue.is_empty() {
            info!(skipped = queue.len(), "Reporting undispatched files as skipped");
        }
        for item in queue {
            reporter.report(item.file.file_name(), Outcome::Skipped);
        }

        self.transition(DispatchState::Finished);
        reporter.finish(&unmatched)
    }

    /// Spawn one writer job
    ///
    /// The returned future resolves to the job's outcome; a panicking writer
    /// becomes a failure for that file only.
    fn launch(&self, item: &WorkItem) -> impl Future<Output = (String, Outcome)> + Send + 'static {
        let job = self.builder.job(item);
        let writer = Arc::clone(&self.writer);
        let file_name = job.file_name.clone();

        let handle = tokio::spawn(async move {
            match writer.write(&job.args, &job.target).await {
                Ok(output) => Outcome::Written(output),
                Err(e) => Outcome::Failed(e.to_string()),
            }
        });

        async move {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Outcome::Failed(format!("Writer task aborted: {}", e)),
            };
            (file_name, outcome)
        }
    }

    fn transition(&mut self, next: DispatchState) {
        info!(from = ?self.state, to = ?next, writer = self.writer.name(), "Dispatch state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResolutionSettings, TagTable};
    use crate::services::exif_writer::WriteError;
    use async_trait::async_trait;
    use std::ffi::OsString;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tagbatch_common::events::event_channel;
    use uuid::Uuid;

    struct CountingWriter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataWriter for CountingWriter {
        fn name(&self) -> &str {
            "counting"
        }

        async fn write(&self, _args: &[OsString], target: &Path) -> Result<String, WriteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if target.to_string_lossy().contains("panic") {
                panic!("writer blew up");
            }
            Ok("1 image files updated".to_string())
        }
    }

    fn items(names: &[&str]) -> Vec<WorkItem> {
        names
            .iter()
            .map(|n| WorkItem::record_free(DiscoveredFile::from_path(format!("/img/{}", n)).unwrap()))
            .collect()
    }

    fn engine(writer: Arc<CountingWriter>, concurrency: usize) -> DispatchEngine {
        DispatchEngine::new(
            writer,
            CommandBuilder::new(TagTable::default(), ResolutionSettings::disabled()),
            concurrency,
        )
    }

    #[test]
    fn test_zero_concurrency_raised_to_one() {
        let writer = Arc::new(CountingWriter { calls: AtomicUsize::new(0) });
        let engine = engine(writer, 0);
        assert_eq!(engine.concurrency(), 1);
        assert_eq!(engine.state(), DispatchState::Idle);
    }

    #[tokio::test]
    async fn test_every_item_reported() {
        let writer = Arc::new(CountingWriter { calls: AtomicUsize::new(0) });
        let mut engine = engine(Arc::clone(&writer), 2);
        let (tx, _rx) = event_channel();
        let reporter = ResultReporter::new(Uuid::new_v4(), tx);

        let result = engine
            .run(items(&["A.tif", "B.tif", "C.tif"]), Vec::new(), reporter, CancellationToken::new())
            .await;

        assert_eq!(result.written(), 3);
        assert_eq!(result.processed, 3);
        assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(engine.state(), DispatchState::Finished);
    }

    #[tokio::test]
    async fn test_empty_queue_finishes() {
        let writer = Arc::new(CountingWriter { calls: AtomicUsize::new(0) });
        let mut engine = engine(writer, 4);
        let (tx, _rx) = event_channel();
        let unmatched = vec![DiscoveredFile::from_path("/img/Z.tif").unwrap()];

        let result = engine
            .run(Vec::new(), unmatched, ResultReporter::new(Uuid::new_v4(), tx), CancellationToken::new())
            .await;

        assert_eq!(result.len(), 1);
        assert_eq!(result.unmatched(), 1);
        assert_eq!(engine.state(), DispatchState::Finished);
    }

    #[tokio::test]
    async fn test_panicking_writer_is_failure_for_that_file() {
        let writer = Arc::new(CountingWriter { calls: AtomicUsize::new(0) });
        let mut engine = engine(writer, 1);
        let (tx, _rx) = event_channel();

        let result = engine
            .run(
                items(&["panic.tif", "ok.tif"]),
                Vec::new(),
                ResultReporter::new(Uuid::new_v4(), tx),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result.outcome_for("panic.tif"), Some(Outcome::Failed(_))));
        assert!(matches!(result.outcome_for("ok.tif"), Some(Outcome::Written(_))));
    }

    #[tokio::test]
    async fn test_stop_before_start_skips_everything() {
        let writer = Arc::new(CountingWriter { calls: AtomicUsize::new(0) });
        let mut engine = engine(Arc::clone(&writer), 2);
        let (tx, _rx) = event_channel();
        let stop = CancellationToken::new();
        stop.cancel();

        let result = engine
            .run(items(&["A.tif", "B.tif"]), Vec::new(), ResultReporter::new(Uuid::new_v4(), tx), stop)
            .await;

        assert_eq!(result.skipped(), 2);
        assert_eq!(result.len(), 2);
        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
    }
}
