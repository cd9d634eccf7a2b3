use seed_config::shared::SeedConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bail;
use crate::concurrency::abort::RunAbort;
use crate::concurrency::shutdown::{
    ShutdownOnDrop, ShutdownRx, ShutdownTx, create_shutdown_channel,
};
use crate::error::{ErrorKind, SeedResult};
use crate::generator::RecordSources;
use crate::progress::ProgressSink;
use crate::store::Store;
use crate::types::RecordLevel;
use crate::workers::assembler::{AssemblyOutcome, GeneratorQueues, HierarchyAssembler};
use crate::workers::generator::GeneratorWorker;
use crate::workers::ingest::{IngestExit, IngestReport, IngestWorker};

/// Lifecycle of a seed run as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// All units are running.
    Running,
    /// The assembler completed and the workers are applying what is left in their queues.
    Draining,
    /// The run is stopping because of a failure or a cancellation.
    Aborting,
    /// Every unit has been joined.
    Stopped,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Running => "running",
            RunPhase::Draining => "draining",
            RunPhase::Aborting => "aborting",
            RunPhase::Stopped => "stopped",
        };

        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Commands each store was expected to receive.
    pub expected: u64,
    pub store_a: Arc<str>,
    pub applied_a: u64,
    pub store_b: Arc<str>,
    pub applied_b: u64,
}

/// A single seed run feeding two stores with the same generated hierarchy.
///
/// The pipeline owns both stores and both progress sinks for the duration of the run. Callers
/// that need to stop the run early keep a [`ShutdownTx`] obtained from
/// [`SeedPipeline::shutdown_tx`] before calling [`SeedPipeline::run`].
#[derive(Debug)]
pub struct SeedPipeline<A, B, PA, PB> {
    config: SeedConfig,
    sources: RecordSources,
    store_a: A,
    store_b: B,
    progress_a: PA,
    progress_b: PB,
    shutdown_tx: ShutdownTx,
}

impl<A, B, PA, PB> SeedPipeline<A, B, PA, PB>
where
    A: Store + Send + Sync + 'static,
    B: Store + Send + Sync + 'static,
    PA: ProgressSink,
    PB: ProgressSink,
{
    pub fn new(
        config: SeedConfig,
        sources: RecordSources,
        store_a: A,
        store_b: B,
        progress_a: PA,
        progress_b: PB,
    ) -> Self {
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            config,
            sources,
            store_a,
            store_b,
            progress_a,
            progress_b,
            shutdown_tx,
        }
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Runs the pipeline until every unit has stopped.
    ///
    /// Returns the first error recorded by any unit. A run stopped through the shutdown signal or
    /// the configured deadline without any failure returns [`ErrorKind::RunCancelled`].
    pub async fn run(self) -> SeedResult<RunSummary> {
        let SeedPipeline {
            config,
            sources,
            store_a,
            store_b,
            progress_a,
            progress_b,
            shutdown_tx,
        } = self;
        let _shutdown_on_drop = ShutdownOnDrop::new(shutdown_tx.clone());

        if let Err(err) = config.validate() {
            bail!(
                ErrorKind::ConfigError,
                "Invalid seed configuration",
                err,
                source: err
            );
        }

        let expected = config.shape.total_work_units();
        info!(
            store_a = store_a.name(),
            store_b = store_b.name(),
            containers = config.shape.container_count,
            groups_per_container = config.shape.groups_per_container,
            items_per_group = config.shape.items_per_group,
            expected,
            "starting seed run"
        );

        let abort = RunAbort::new(shutdown_tx.clone());
        let shutdown_rx = abort.shutdown_rx();
        let queues = config.queues;

        // We start the generators first so that their queues fill up while the rest starts.
        let (containers_tx, containers_rx) = mpsc::channel(queues.container_capacity);
        let (groups_tx, groups_rx) = mpsc::channel(queues.group_capacity);
        let (items_tx, items_rx) = mpsc::channel(queues.item_capacity);
        let generators = vec![
            GeneratorWorker::new(
                RecordLevel::Container,
                sources.containers,
                containers_tx,
                abort.clone(),
            )
            .spawn(),
            GeneratorWorker::new(RecordLevel::Group, sources.groups, groups_tx, abort.clone())
                .spawn(),
            GeneratorWorker::new(RecordLevel::Item, sources.items, items_tx, abort.clone())
                .spawn(),
        ];

        let (commands_a_tx, commands_a_rx) = mpsc::channel(queues.command_capacity);
        let (commands_b_tx, commands_b_rx) = mpsc::channel(queues.command_capacity);
        let worker_a = IngestWorker::new(store_a, progress_a, commands_a_rx, abort.clone()).spawn();
        let worker_b = IngestWorker::new(store_b, progress_b, commands_b_rx, abort.clone()).spawn();

        let assembler = HierarchyAssembler::new(
            config.shape,
            GeneratorQueues {
                containers: containers_rx,
                groups: groups_rx,
                items: items_rx,
            },
            commands_a_tx,
            commands_b_tx,
            abort.clone(),
        )
        .spawn();

        let deadline = config
            .deadline_ms
            .map(|deadline_ms| spawn_deadline(deadline_ms, shutdown_tx.clone()));

        let mut phase = RunPhase::Running;
        info!(%phase, "seed run phase changed");

        // The assembler closes both command queues when it stops, which lets the workers drain.
        let (completed, generator_queues) = match assembler.wait().await {
            Ok(Some(report)) => (
                report.outcome == AssemblyOutcome::Completed,
                Some(report.queues),
            ),
            Ok(None) => (false, None),
            Err(err) => {
                abort.abort(err);
                (false, None)
            }
        };

        phase = transition(
            phase,
            if completed {
                RunPhase::Draining
            } else {
                RunPhase::Aborting
            },
        );

        // Both workers are always joined, even when the other one failed.
        let (result_a, result_b) = futures::future::join(worker_a.wait(), worker_b.wait()).await;
        let report_a = settle_worker(&abort, result_a);
        let report_b = settle_worker(&abort, result_b);

        // Nothing consumes the generator queues anymore, so we stop the generators.
        shutdown_tx.shutdown();
        if let Some(generator_queues) = generator_queues {
            let drained = drain_generator_queues(generator_queues, &shutdown_rx).await;
            debug!(drained, "drained generator queues");
        }

        for generator in generators {
            if let Err(err) = generator.wait().await {
                abort.abort(err);
            }
        }

        if let Some(deadline) = deadline {
            deadline.abort();
        }

        transition(phase, RunPhase::Stopped);

        if let Some(err) = abort.first_error() {
            return Err(err);
        }

        let (Some(report_a), Some(report_b)) = (report_a, report_b) else {
            bail!(
                ErrorKind::RunCancelled,
                "Seed run was cancelled before completion"
            );
        };

        if !completed || report_a.exit != IngestExit::Drained || report_b.exit != IngestExit::Drained
        {
            bail!(
                ErrorKind::RunCancelled,
                "Seed run was cancelled before completion",
                format!(
                    "applied {} of {expected} commands to {} and {} to {}",
                    report_a.applied, report_a.store, report_b.applied, report_b.store
                )
            );
        }

        info!(
            applied_a = report_a.applied,
            applied_b = report_b.applied,
            "seed run completed"
        );

        Ok(RunSummary {
            expected,
            store_a: report_a.store,
            applied_a: report_a.applied,
            store_b: report_b.store,
            applied_b: report_b.applied,
        })
    }
}

/// Runs a seed pipeline with lorem ipsum sources and waits for it to stop.
pub async fn run_pipeline<A, B, PA, PB>(
    config: SeedConfig,
    store_a: A,
    store_b: B,
    progress_a: PA,
    progress_b: PB,
) -> SeedResult<()>
where
    A: Store + Send + Sync + 'static,
    B: Store + Send + Sync + 'static,
    PA: ProgressSink,
    PB: ProgressSink,
{
    SeedPipeline::new(
        config,
        RecordSources::lorem(),
        store_a,
        store_b,
        progress_a,
        progress_b,
    )
    .run()
    .await
    .map(|_| ())
}

fn transition(from: RunPhase, to: RunPhase) -> RunPhase {
    info!(%from, %to, "seed run phase changed");
    to
}

fn settle_worker(
    abort: &RunAbort,
    result: SeedResult<Option<IngestReport>>,
) -> Option<IngestReport> {
    match result {
        Ok(report) => report,
        Err(err) => {
            abort.abort(err);
            None
        }
    }
}

/// Fires the shutdown signal once `deadline_ms` elapsed, unless the run stopped before.
fn spawn_deadline(deadline_ms: u64, shutdown_tx: ShutdownTx) -> JoinHandle<()> {
    let shutdown_rx = shutdown_tx.subscribe();

    tokio::spawn(async move {
        tokio::select! {
            biased;

            _ = shutdown_rx.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(deadline_ms)) => {
                warn!(deadline_ms, "seed run deadline reached, cancelling");
                shutdown_tx.shutdown();
            }
        }
    })
}

/// Takes at most one pending record from each generator queue.
///
/// Each receive races the (already fired) shutdown signal, so an empty queue never blocks.
async fn drain_generator_queues(mut queues: GeneratorQueues, shutdown_rx: &ShutdownRx) -> usize {
    let mut drained = 0;

    for queue in [&mut queues.containers, &mut queues.groups, &mut queues.items] {
        tokio::select! {
            biased;

            record = queue.recv() => {
                if record.is_some() {
                    drained += 1;
                }
            }
            _ = shutdown_rx.cancelled() => {}
        }
    }

    drained
}
