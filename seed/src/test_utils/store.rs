use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use uuid::Uuid;

use crate::bail;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{ErrorKind, SeedResult};
use crate::store::memory::MemoryStore;
use crate::store::{RowCounts, Store};
use crate::types::{InsertCommand, SyntheticRecord};

/// [`MemoryStore`] wrapper that injects failures, panics and latency into inserts.
///
/// Inserts are numbered from 1 in the order they are attempted. Clones share their counters and
/// the wrapped store, so a test can keep a clone while the pipeline owns the original.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_at: Option<u64>,
    panic_at: Option<u64>,
    delay: Option<Duration>,
    attempts: Arc<AtomicU64>,
    started_after_shutdown: Arc<AtomicU64>,
    shutdown_rx: Arc<OnceLock<ShutdownRx>>,
}

impl FaultyStore {
    pub fn new(name: &str) -> Self {
        Self {
            inner: MemoryStore::new(name),
            fail_at: None,
            panic_at: None,
            delay: None,
            attempts: Arc::new(AtomicU64::new(0)),
            started_after_shutdown: Arc::new(AtomicU64::new(0)),
            shutdown_rx: Arc::new(OnceLock::new()),
        }
    }

    /// Fails the `attempt`-th insert with [`ErrorKind::StoreInsertFailed`].
    pub fn failing_at(mut self, attempt: u64) -> Self {
        self.fail_at = Some(attempt);
        self
    }

    /// Panics inside the `attempt`-th insert.
    pub fn panicking_at(mut self, attempt: u64) -> Self {
        self.panic_at = Some(attempt);
        self
    }

    /// Sleeps for `delay` before every insert.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Starts counting inserts that begin after `shutdown_rx` fired.
    ///
    /// Only the first call has an effect.
    pub fn observe_shutdown(&self, shutdown_rx: ShutdownRx) {
        let _ = self.shutdown_rx.set(shutdown_rx);
    }

    pub async fn commands(&self) -> Vec<InsertCommand> {
        self.inner.commands().await
    }

    /// Number of inserts attempted, including failed ones.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of inserts that started once the observed shutdown signal had fired.
    pub fn started_after_shutdown(&self) -> u64 {
        self.started_after_shutdown.load(Ordering::SeqCst)
    }

    async fn before_insert(&self) -> SeedResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if self
            .shutdown_rx
            .get()
            .is_some_and(|shutdown_rx| shutdown_rx.is_shutdown())
        {
            self.started_after_shutdown.fetch_add(1, Ordering::SeqCst);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.panic_at == Some(attempt) {
            panic!("injected panic in insert {attempt} of store {}", self.name());
        }

        if self.fail_at == Some(attempt) {
            bail!(
                ErrorKind::StoreInsertFailed,
                "Injected insert failure",
                format!("insert {attempt} of store {}", self.name())
            );
        }

        Ok(())
    }
}

impl Store for FaultyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_container(&self, record: &SyntheticRecord) -> SeedResult<()> {
        self.before_insert().await?;
        self.inner.insert_container(record).await
    }

    async fn insert_group(&self, container_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        self.before_insert().await?;
        self.inner.insert_group(container_id, record).await
    }

    async fn insert_item(&self, group_id: Uuid, record: &SyntheticRecord) -> SeedResult<()> {
        self.before_insert().await?;
        self.inner.insert_item(group_id, record).await
    }

    async fn count_rows(&self) -> SeedResult<RowCounts> {
        self.inner.count_rows().await
    }
}
