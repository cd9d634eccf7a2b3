use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::abort::RunAbort;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::SeedResult;
use crate::progress::ProgressSink;
use crate::store::Store;
use crate::types::InsertCommand;
use crate::workers::base::{WorkerType, join_error};

/// How an ingestion worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestExit {
    /// The command queue was closed and every queued command was applied.
    Drained,
    /// Shutdown was observed before the queue was drained.
    Cancelled,
    /// An insert failed. The error was recorded for the run.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub store: Arc<str>,
    pub exit: IngestExit,
    /// Number of commands successfully applied.
    pub applied: u64,
}

/// Handle for waiting on an ingestion worker.
#[derive(Debug)]
pub struct IngestWorkerHandle {
    worker_type: WorkerType,
    handle: Option<JoinHandle<IngestReport>>,
}

impl IngestWorkerHandle {
    pub async fn wait(mut self) -> SeedResult<Option<IngestReport>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };

        handle
            .await
            .map(Some)
            .map_err(|err| join_error(&self.worker_type, err))
    }
}

/// Worker applying the commands of one queue to one store, in order.
///
/// Shutdown is checked before each command is taken, never while an insert is in flight, so
/// after the signal fires the store sees at most the insert that was already running.
pub struct IngestWorker<S, P> {
    store: S,
    progress: P,
    commands: mpsc::Receiver<InsertCommand>,
    abort: RunAbort,
    shutdown_rx: ShutdownRx,
}

impl<S, P> IngestWorker<S, P>
where
    S: Store + Send + Sync + 'static,
    P: ProgressSink,
{
    pub fn new(
        store: S,
        progress: P,
        commands: mpsc::Receiver<InsertCommand>,
        abort: RunAbort,
    ) -> Self {
        let shutdown_rx = abort.shutdown_rx();

        Self {
            store,
            progress,
            commands,
            abort,
            shutdown_rx,
        }
    }

    pub fn spawn(self) -> IngestWorkerHandle {
        let store: Arc<str> = Arc::from(self.store.name());
        let span = tracing::info_span!("ingest_worker", store = %store);
        let handle = tokio::spawn(self.run().instrument(span));

        IngestWorkerHandle {
            worker_type: WorkerType::Ingest { store },
            handle: Some(handle),
        }
    }

    async fn run(mut self) -> IngestReport {
        let mut applied = 0;

        let exit = loop {
            if self.shutdown_rx.is_shutdown() {
                break IngestExit::Cancelled;
            }

            let command = tokio::select! {
                biased;

                _ = self.shutdown_rx.cancelled() => break IngestExit::Cancelled,
                command = self.commands.recv() => command,
            };

            let Some(command) = command else {
                break IngestExit::Drained;
            };

            if let Err(err) = self.apply(&command).await {
                let message = format!("{}: insert failed: {}", self.store.name(), err.description());
                self.progress.log(&message);
                self.abort.abort(err);
                break IngestExit::Failed;
            }

            self.progress.increment();
            applied += 1;
        };

        info!(?exit, applied, "ingest worker stopped");

        IngestReport {
            store: Arc::from(self.store.name()),
            exit,
            applied,
        }
    }

    async fn apply(&self, command: &InsertCommand) -> SeedResult<()> {
        let result = match command {
            InsertCommand::InsertContainer { record } => {
                self.store.insert_container(record).await
            }
            InsertCommand::InsertGroup {
                container_id,
                record,
            } => self.store.insert_group(*container_id, record).await,
            InsertCommand::InsertItem { group_id, record } => {
                self.store.insert_item(*group_id, record).await
            }
        };

        if result.is_ok() {
            debug!(level = %command.level(), id = %command.record().id, "applied command");
        }

        result
    }
}
