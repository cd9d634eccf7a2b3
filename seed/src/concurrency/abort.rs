use std::sync::{Arc, OnceLock};
use tracing::{debug, error};

use crate::concurrency::shutdown::{ShutdownRx, ShutdownTx};
use crate::error::SeedError;

/// Records the first failure of a run and fires the shutdown signal.
///
/// Every unit holds a clone. The first call to [`RunAbort::abort`] stores its error; later calls
/// only fire the (already fired) signal and their errors are dropped since they are consequences
/// of the first one.
#[derive(Debug, Clone)]
pub struct RunAbort {
    first_error: Arc<OnceLock<SeedError>>,
    shutdown_tx: ShutdownTx,
}

impl RunAbort {
    pub fn new(shutdown_tx: ShutdownTx) -> Self {
        Self {
            first_error: Arc::new(OnceLock::new()),
            shutdown_tx,
        }
    }

    /// Records `err` if no failure was recorded yet and fires the shutdown signal.
    ///
    /// Returns `true` when `err` became the failure of the run.
    pub fn abort(&self, err: SeedError) -> bool {
        let recorded = match self.first_error.set(err) {
            Ok(()) => {
                if let Some(err) = self.first_error.get() {
                    error!(kind = ?err.kind(), "seed run failed, shutting down: {err}");
                }
                true
            }
            Err(err) => {
                debug!(kind = ?err.kind(), "ignoring failure after the run was already aborted");
                false
            }
        };

        self.shutdown_tx.shutdown();

        recorded
    }

    /// Returns the failure recorded first, if any.
    pub fn first_error(&self) -> Option<SeedError> {
        self.first_error.get().cloned()
    }

    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    pub fn shutdown_rx(&self) -> ShutdownRx {
        self.shutdown_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use crate::error::ErrorKind;

    #[test]
    fn first_failure_wins() {
        let (tx, rx) = create_shutdown_channel();
        let abort = RunAbort::new(tx);

        assert!(abort.abort(SeedError::from((
            ErrorKind::StoreInsertFailed,
            "Insert failed"
        ))));
        assert!(!abort.clone().abort(SeedError::from((
            ErrorKind::GenerationFailed,
            "Record source failed"
        ))));

        assert!(rx.is_shutdown());
        assert_eq!(
            abort.first_error().map(|err| err.kind()),
            Some(ErrorKind::StoreInsertFailed)
        );
    }

    #[test]
    fn no_failure_is_recorded_without_abort() {
        let (tx, _rx) = create_shutdown_channel();
        let abort = RunAbort::new(tx);

        abort.shutdown_tx().shutdown();

        assert!(abort.first_error().is_none());
        assert!(abort.shutdown_rx().is_shutdown());
    }
}
