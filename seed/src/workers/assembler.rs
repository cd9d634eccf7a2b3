use seed_config::shared::SeedShapeConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::abort::RunAbort;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, SeedResult};
use crate::seed_error;
use crate::types::{InsertCommand, RecordLevel, SyntheticRecord};
use crate::workers::base::{WorkerType, join_error};

/// Receiving ends of the three generator queues.
///
/// Handed back by the assembler once it stops so the coordinator can drain them.
#[derive(Debug)]
pub struct GeneratorQueues {
    pub containers: mpsc::Receiver<SyntheticRecord>,
    pub groups: mpsc::Receiver<SyntheticRecord>,
    pub items: mpsc::Receiver<SyntheticRecord>,
}

impl GeneratorQueues {
    fn get_mut(&mut self, level: RecordLevel) -> &mut mpsc::Receiver<SyntheticRecord> {
        match level {
            RecordLevel::Container => &mut self.containers,
            RecordLevel::Group => &mut self.groups,
            RecordLevel::Item => &mut self.items,
        }
    }
}

/// How the hierarchy walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// Every command was emitted to both ingestion workers.
    Completed,
    /// The walk stopped early because of shutdown or because a worker went away.
    Cancelled,
}

#[derive(Debug)]
pub struct AssemblyReport {
    pub outcome: AssemblyOutcome,
    pub queues: GeneratorQueues,
}

/// Handle for waiting on the assembler.
#[derive(Debug)]
pub struct AssemblerHandle {
    handle: Option<JoinHandle<AssemblyReport>>,
}

impl AssemblerHandle {
    pub async fn wait(mut self) -> SeedResult<Option<AssemblyReport>> {
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };

        handle
            .await
            .map(Some)
            .map_err(|err| join_error(&WorkerType::Assembler, err))
    }
}

/// Single writer turning the three record streams into ordered insert commands.
///
/// The walk is strictly nested: a container, then each of its groups, each group followed by its
/// items. Every command is sent to worker A before worker B, so both queues carry the same
/// sequence and a parent is always queued before anything referencing it. Backpressure from
/// either worker stalls the walk.
pub struct HierarchyAssembler {
    shape: SeedShapeConfig,
    queues: GeneratorQueues,
    commands_a: mpsc::Sender<InsertCommand>,
    commands_b: mpsc::Sender<InsertCommand>,
    abort: RunAbort,
    shutdown_rx: ShutdownRx,
}

impl HierarchyAssembler {
    pub fn new(
        shape: SeedShapeConfig,
        queues: GeneratorQueues,
        commands_a: mpsc::Sender<InsertCommand>,
        commands_b: mpsc::Sender<InsertCommand>,
        abort: RunAbort,
    ) -> Self {
        let shutdown_rx = abort.shutdown_rx();

        Self {
            shape,
            queues,
            commands_a,
            commands_b,
            abort,
            shutdown_rx,
        }
    }

    pub fn spawn(self) -> AssemblerHandle {
        let span = tracing::info_span!(
            "assembler",
            containers = self.shape.container_count,
            groups_per_container = self.shape.groups_per_container,
            items_per_group = self.shape.items_per_group
        );
        let handle = tokio::spawn(self.run().instrument(span));

        AssemblerHandle {
            handle: Some(handle),
        }
    }

    /// Walks the hierarchy, then closes both command queues by dropping their senders.
    pub async fn run(mut self) -> AssemblyReport {
        let outcome = self.assemble().await;

        let HierarchyAssembler {
            queues,
            commands_a,
            commands_b,
            ..
        } = self;
        drop(commands_a);
        drop(commands_b);

        info!(?outcome, "assembler stopped, command queues closed");

        AssemblyReport { outcome, queues }
    }

    async fn assemble(&mut self) -> AssemblyOutcome {
        for _ in 0..self.shape.container_count {
            let Some(container) = self.pull(RecordLevel::Container).await else {
                return AssemblyOutcome::Cancelled;
            };
            let container_id = container.id;
            if !self
                .emit(InsertCommand::InsertContainer { record: container })
                .await
            {
                return AssemblyOutcome::Cancelled;
            }

            for _ in 0..self.shape.groups_per_container {
                let Some(group) = self.pull(RecordLevel::Group).await else {
                    return AssemblyOutcome::Cancelled;
                };
                let group_id = group.id;
                if !self
                    .emit(InsertCommand::InsertGroup {
                        container_id,
                        record: group,
                    })
                    .await
                {
                    return AssemblyOutcome::Cancelled;
                }

                for _ in 0..self.shape.items_per_group {
                    let Some(item) = self.pull(RecordLevel::Item).await else {
                        return AssemblyOutcome::Cancelled;
                    };
                    if !self
                        .emit(InsertCommand::InsertItem {
                            group_id,
                            record: item,
                        })
                        .await
                    {
                        return AssemblyOutcome::Cancelled;
                    }
                }
            }
        }

        AssemblyOutcome::Completed
    }

    /// Takes exactly one record of `level`, or [`None`] if the run must stop.
    ///
    /// A queue closing while no shutdown was requested means its generator died without
    /// recording an error, which fails the run.
    async fn pull(&mut self, level: RecordLevel) -> Option<Arc<SyntheticRecord>> {
        let queue = self.queues.get_mut(level);

        let record = tokio::select! {
            biased;

            _ = self.shutdown_rx.cancelled() => return None,
            record = queue.recv() => record,
        };

        match record {
            Some(record) => Some(Arc::new(record)),
            None => {
                if !self.shutdown_rx.is_shutdown() {
                    self.abort.abort(seed_error!(
                        ErrorKind::GenerationFailed,
                        "Record queue closed unexpectedly",
                        format!("the {level} generator stopped before the run ended")
                    ));
                }
                None
            }
        }
    }

    /// Sends `command` to worker A, then to worker B.
    ///
    /// Returns `false` if shutdown fired or a worker no longer accepts commands. A worker only
    /// stops early after recording a failure or observing shutdown, so neither case is an
    /// additional error.
    async fn emit(&self, command: InsertCommand) -> bool {
        for queue in [&self.commands_a, &self.commands_b] {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.cancelled() => return false,
                result = queue.send(command.clone()) => {
                    if result.is_err() {
                        debug!("command queue closed, stopping assembler");
                        return false;
                    }
                }
            }
        }

        true
    }
}
