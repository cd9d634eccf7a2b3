use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::abort::RunAbort;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::SeedResult;
use crate::generator::RecordSource;
use crate::types::{RecordLevel, SyntheticRecord};
use crate::workers::base::{WorkerType, join_error};

/// Handle for waiting on a generator worker.
#[derive(Debug)]
pub struct GeneratorWorkerHandle {
    worker_type: WorkerType,
    handle: Option<JoinHandle<u64>>,
}

impl GeneratorWorkerHandle {
    /// Waits for the generator to stop and returns how many records it queued.
    pub async fn wait(mut self) -> SeedResult<u64> {
        let Some(handle) = self.handle.take() else {
            return Ok(0);
        };

        handle
            .await
            .map_err(|err| join_error(&self.worker_type, err))
    }
}

/// Worker pushing the records of one level into a bounded queue until told to stop.
///
/// The generator never ends on its own. It stops when the shutdown signal fires, when the
/// receiving side of its queue is dropped, or when its source fails. A source failure is recorded
/// as the failure of the run.
pub struct GeneratorWorker<S> {
    level: RecordLevel,
    source: S,
    queue: mpsc::Sender<SyntheticRecord>,
    abort: RunAbort,
    shutdown_rx: ShutdownRx,
}

impl<S> GeneratorWorker<S>
where
    S: RecordSource,
{
    pub fn new(
        level: RecordLevel,
        source: S,
        queue: mpsc::Sender<SyntheticRecord>,
        abort: RunAbort,
    ) -> Self {
        let shutdown_rx = abort.shutdown_rx();

        Self {
            level,
            source,
            queue,
            abort,
            shutdown_rx,
        }
    }

    pub fn spawn(self) -> GeneratorWorkerHandle {
        let worker_type = WorkerType::Generator { level: self.level };
        let span = tracing::info_span!("generator", level = %self.level);
        let handle = tokio::spawn(self.run().instrument(span));

        GeneratorWorkerHandle {
            worker_type,
            handle: Some(handle),
        }
    }

    async fn run(mut self) -> u64 {
        let mut produced = 0;

        loop {
            if self.shutdown_rx.is_shutdown() {
                break;
            }

            let record = match self.source.next_record() {
                Ok(record) => record,
                Err(err) => {
                    self.abort.abort(err);
                    break;
                }
            };

            tokio::select! {
                biased;

                _ = self.shutdown_rx.cancelled() => break,
                result = self.queue.send(record) => {
                    if result.is_err() {
                        debug!("record queue closed, stopping generator");
                        break;
                    }
                    produced += 1;
                }
            }
        }

        info!(produced, "generator stopped");

        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::error::ErrorKind;
    use crate::generator::LoremSource;
    use crate::test_utils::source::FailingSource;
    use std::time::Duration;

    #[tokio::test]
    async fn parked_generator_stops_on_shutdown() {
        let (shutdown_tx, _shutdown_rx) = create_shutdown_channel();
        let abort = RunAbort::new(shutdown_tx.clone());
        let (tx, mut rx) = mpsc::channel(2);

        let handle = GeneratorWorker::new(
            RecordLevel::Item,
            LoremSource::with_seed(RecordLevel::Item, 1),
            tx,
            abort.clone(),
        )
        .spawn();

        // Let the generator fill the queue and park on the next send.
        rx.recv().await.unwrap();
        shutdown_tx.shutdown();

        let produced = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert!(produced >= 1);
        assert!(abort.first_error().is_none());
    }

    #[tokio::test]
    async fn failing_source_aborts_the_run() {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let abort = RunAbort::new(shutdown_tx);
        let (tx, mut rx) = mpsc::channel(10);

        let handle = GeneratorWorker::new(
            RecordLevel::Group,
            FailingSource::new(RecordLevel::Group, 3),
            tx,
            abort.clone(),
        )
        .spawn();

        let produced = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(produced, 3);
        assert!(shutdown_rx.is_shutdown());
        assert_eq!(
            abort.first_error().map(|err| err.kind()),
            Some(ErrorKind::GenerationFailed)
        );
        for _ in 0..3 {
            assert!(rx.recv().await.is_some());
        }
        assert!(rx.recv().await.is_none());
    }
}
