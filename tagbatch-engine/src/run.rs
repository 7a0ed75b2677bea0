//! Starting a tagging run and observing it
//!
//! `start` does all validation up front: bad inputs are returned as errors
//! before any file is touched. Once it returns a handle the run always ends
//! with a `RunCompleted` event and a `RunResult`.

use crate::config::RunConfig;
use crate::models::{RecordStore, RunResult};
use crate::services::{
    reconcile, CommandBuilder, DispatchEngine, FileScanner, MetadataWriter, NameMatcher,
    ResultReporter,
};
use futures::Stream;
use std::path::Path;
use std::sync::Arc;
use tagbatch_common::events::{event_channel, EventReceiver, RunEvent};
use tagbatch_common::{Error, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// A run in progress
pub struct RunHandle {
    run_id: Uuid,
    events: EventReceiver,
    stop: CancellationToken,
    task: JoinHandle<RunResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Ask the run to stop launching jobs
    ///
    /// Running jobs finish normally; queued ones are reported as skipped.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            info!(run_id = %self.run_id, "Stop requested");
        }
        self.stop.cancel();
    }

    /// Token that stops this run when cancelled (e.g. from a signal handler)
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Next event, `None` once the run has completed and all events were read
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Stream of the remaining events
    ///
    /// The stream ends after `RunCompleted`; the run result itself is dropped.
    pub fn into_stream(self) -> impl Stream<Item = RunEvent> {
        let mut events = self.events;
        async_stream::stream! {
            while let Some(event) = events.recv().await {
                yield event;
            }
        }
    }

    /// Wait for the run to finish; unread events are discarded
    pub async fn wait(self) -> Result<RunResult> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Run task failed: {}", e)))
    }

    /// Read every event, then return them with the run result
    pub async fn collect(mut self) -> Result<(Vec<RunEvent>, RunResult)> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let result = self.wait().await?;
        Ok((events, result))
    }
}

/// Start tagging the image files in `directory`
///
/// With `config.update_from_store` set, `store` must hold at least one
/// record; otherwise it is ignored and every file is written with the
/// resolution tags only.
pub async fn start(
    directory: impl AsRef<Path>,
    store: Option<Arc<RecordStore>>,
    config: RunConfig,
    writer: Arc<dyn MetadataWriter>,
) -> Result<RunHandle> {
    let directory = directory.as_ref().to_path_buf();

    config.validate()?;
    let matcher = NameMatcher::from_settings(&config.matching)?;

    if config.update_from_store && store.as_ref().map_or(true, |s| s.is_empty()) {
        return Err(Error::InvalidInput(
            "No records loaded; load a spreadsheet or run without record updates".to_string(),
        ));
    }

    let scanner = FileScanner::new().recursive(config.recursive);
    let scan_root = directory.clone();
    let files = tokio::task::spawn_blocking(move || scanner.scan(&scan_root))
        .await
        .map_err(|e| Error::Internal(format!("Scan task failed: {}", e)))??;

    let reconciliation = reconcile(files, store.as_deref(), &matcher, config.update_from_store);

    let run_id = Uuid::new_v4();
    let concurrency = config.effective_concurrency();
    let (events_tx, events_rx) = event_channel();

    info!(
        run_id = %run_id,
        directory = %directory.display(),
        queued = reconciliation.queue.len(),
        unmatched = reconciliation.unmatched.len(),
        concurrency,
        "Starting tagging run"
    );

    events_tx.emit_lossy(RunEvent::RunStarted {
        run_id,
        directory: directory.display().to_string(),
        concurrency,
        timestamp: chrono::Utc::now(),
    });

    let stop = CancellationToken::new();
    let mut engine = DispatchEngine::new(writer, CommandBuilder::from_config(&config), concurrency);
    let reporter = ResultReporter::new(run_id, events_tx);
    let task_stop = stop.clone();

    let task = tokio::spawn(async move {
        engine
            .run(reconciliation.queue, reconciliation.unmatched, reporter, task_stop)
            .await
    });

    Ok(RunHandle {
        run_id,
        events: events_rx,
        stop,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ExifToolWriter;

    fn writer() -> Arc<dyn MetadataWriter> {
        Arc::new(ExifToolWriter::new("exiftool"))
    }

    #[tokio::test]
    async fn test_missing_directory_rejected() {
        let config = RunConfig {
            update_from_store: false,
            ..RunConfig::default()
        };
        let result = start("/nonexistent/scans", None, config, writer()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_store_required_when_updating_from_it() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = start(temp_dir.path(), None, RunConfig::default(), writer()).await;
        match result {
            Err(Error::InvalidInput(msg)) => assert!(msg.contains("without record updates")),
            Err(other) => panic!("Expected InvalidInput, got {:?}", other),
            Ok(_) => panic!("Expected InvalidInput, got a running handle"),
        }

        let empty = Arc::new(RecordStore::default());
        let result = start(temp_dir.path(), Some(empty), RunConfig::default(), writer()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_bad_ignore_pattern_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = RunConfig {
            update_from_store: false,
            ..RunConfig::default()
        };
        config.matching.ignore_patterns = vec!["(unclosed".to_string()];
        let result = start(temp_dir.path(), None, config, writer()).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_directory_completes() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = RunConfig {
            update_from_store: false,
            ..RunConfig::default()
        };
        let handle = start(temp_dir.path(), None, config, writer()).await.unwrap();
        let (events, result) = handle.collect().await.unwrap();

        assert!(result.is_empty());
        assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
        assert!(events.last().unwrap().is_terminal());
    }
}
