//! Broadcast shutdown signal for a seed run.
//!
//! The signal is a watch channel holding a boolean which only ever transitions from `false` to
//! `true`. Every blocking send or receive in the pipeline selects on [`ShutdownRx::cancelled`]
//! so that a unit parked on a full or empty queue is released as soon as the signal fires.

use std::sync::Arc;
use tokio::sync::watch;

/// Sending side of the shutdown signal.
///
/// Cloning is cheap and every clone fires the same signal. Firing is idempotent.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<bool>>);

impl ShutdownTx {
    /// Fires the shutdown signal.
    ///
    /// The value is replaced even when no receiver is alive so that receivers subscribed later
    /// still observe the signal.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    /// Creates a new receiver observing this signal.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }

    /// Returns `true` once the signal has fired.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// Receiving side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Returns `true` once the signal has fired.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Completes once the signal has fired.
    ///
    /// Completes immediately if the signal already fired. If every sender is dropped without
    /// firing, the future never completes.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|is_shutdown| *is_shutdown).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Fires the shutdown signal when dropped.
///
/// Held for the lifetime of a run so that dropping the run future stops every spawned unit.
#[derive(Debug)]
pub struct ShutdownOnDrop(ShutdownTx);

impl ShutdownOnDrop {
    pub fn new(shutdown_tx: ShutdownTx) -> Self {
        Self(shutdown_tx)
    }
}

impl Drop for ShutdownOnDrop {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// Creates a new shutdown channel in the not fired state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(Arc::new(tx)), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_completes_for_every_receiver() {
        let (tx, rx) = create_shutdown_channel();
        let late_rx = tx.subscribe();

        assert!(!rx.is_shutdown());
        tx.shutdown();
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(1), rx.cancelled())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), late_rx.cancelled())
            .await
            .unwrap();
        assert!(tx.is_shutdown());
    }

    #[tokio::test]
    async fn subscribing_after_shutdown_observes_the_signal() {
        let (tx, rx) = create_shutdown_channel();
        drop(rx);
        tx.shutdown();

        let rx = tx.subscribe();

        assert!(rx.is_shutdown());
        tokio::time::timeout(Duration::from_secs(1), rx.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_stays_pending_when_sender_is_dropped() {
        let (tx, rx) = create_shutdown_channel();
        drop(tx);

        let result = tokio::time::timeout(Duration::from_millis(50), rx.cancelled()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dropping_the_guard_fires_the_signal() {
        let (tx, rx) = create_shutdown_channel();
        let guard = ShutdownOnDrop::new(tx.clone());

        assert!(!rx.is_shutdown());
        drop(guard);

        assert!(tx.is_shutdown());
        tokio::time::timeout(Duration::from_secs(1), rx.cancelled())
            .await
            .unwrap();
    }
}
