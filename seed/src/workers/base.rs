use std::fmt;
use std::sync::Arc;
use tokio::task::JoinError;

use crate::error::{ErrorKind, SeedError};
use crate::seed_error;
use crate::types::RecordLevel;

/// Classification of pipeline units, used for spans and panic reporting.
#[derive(Debug, Clone)]
pub enum WorkerType {
    /// Produces records for one level into its bounded queue.
    Generator { level: RecordLevel },
    /// Walks the hierarchy and emits commands to both ingestion workers.
    Assembler,
    /// Applies commands to one store.
    Ingest { store: Arc<str> },
}

impl WorkerType {
    /// Error kind reported when the unit's task dies.
    pub fn panic_kind(&self) -> ErrorKind {
        match self {
            WorkerType::Generator { .. } => ErrorKind::GeneratorPanic,
            WorkerType::Assembler => ErrorKind::AssemblerPanic,
            WorkerType::Ingest { .. } => ErrorKind::IngestWorkerPanic,
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::Generator { level } => write!(f, "{level} generator"),
            WorkerType::Assembler => f.write_str("assembler"),
            WorkerType::Ingest { store } => write!(f, "ingest worker for {store}"),
        }
    }
}

/// Converts the failure of a unit's task into the error recorded for the run.
pub(crate) fn join_error(worker_type: &WorkerType, err: JoinError) -> SeedError {
    if err.is_cancelled() {
        seed_error!(
            worker_type.panic_kind(),
            "Pipeline unit was cancelled",
            format!("{worker_type}: {err}")
        )
    } else {
        seed_error!(
            worker_type.panic_kind(),
            "Pipeline unit panicked",
            format!("{worker_type}: {err}")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicking_task_maps_to_worker_kind() {
        let worker_type = WorkerType::Ingest {
            store: Arc::from("store_b"),
        };
        let handle = tokio::spawn(async { panic!("boom") });

        let err = join_error(&worker_type, handle.await.unwrap_err());

        assert_eq!(err.kind(), ErrorKind::IngestWorkerPanic);
        assert!(err.detail().unwrap().starts_with("ingest worker for store_b"));
    }
}
