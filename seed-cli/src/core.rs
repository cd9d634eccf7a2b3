use indicatif::MultiProgress;
use seed::error::SeedResult;
use seed::generator::RecordSources;
use seed::pipeline::{RunSummary, SeedPipeline};
use seed::progress::{LogProgress, ProgressBarSink, ProgressSink};
use seed::store::Store;
use seed::store::read::{HierarchyCounts, ReadStrategy};
use seed_config::shared::{SeedConfig, SeederConfig};
use std::time::Instant;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use crate::stores::ConfiguredStore;

/// Log a progress line every this many applied commands when bars are disabled.
const LOG_PROGRESS_EVERY: u64 = 10_000;

/// Command line overrides of the configured seed shape.
#[derive(Debug, Default)]
pub struct ShapeOverrides {
    pub container_count: Option<u64>,
    pub groups_per_container: Option<u64>,
    pub items_per_group: Option<u64>,
    pub deadline_ms: Option<u64>,
}

impl ShapeOverrides {
    fn apply(&self, config: &mut SeedConfig) {
        if let Some(container_count) = self.container_count {
            config.shape.container_count = container_count;
        }
        if let Some(groups_per_container) = self.groups_per_container {
            config.shape.groups_per_container = groups_per_container;
        }
        if let Some(items_per_group) = self.items_per_group {
            config.shape.items_per_group = items_per_group;
        }
        if self.deadline_ms.is_some() {
            config.deadline_ms = self.deadline_ms;
        }
    }
}

/// Connects both stores, creates their schemas and runs one seed pipeline against them.
pub async fn seed_stores(
    mut config: SeederConfig,
    overrides: ShapeOverrides,
    progress_bars: bool,
) -> anyhow::Result<()> {
    overrides.apply(&mut config.seed);
    config.validate()?;

    info!(
        store_a = config.store_a.kind(),
        store_b = config.store_b.kind(),
        containers = config.seed.shape.container_count,
        groups_per_container = config.seed.shape.groups_per_container,
        items_per_group = config.seed.shape.items_per_group,
        deadline_ms = ?config.seed.deadline_ms,
        "seeding stores"
    );

    let (store_a, store_b) = connect_stores(&config).await?;
    store_a.ensure_schema().await?;
    store_b.ensure_schema().await?;

    let total = config.seed.shape.total_work_units();
    let result = if progress_bars {
        let multi = MultiProgress::new();
        let progress_a = ProgressBarSink::new(&multi, store_a.name(), total);
        let progress_b = ProgressBarSink::new(&multi, store_b.name(), total);

        let result = run_until_signal(
            config.seed,
            store_a.clone(),
            store_b.clone(),
            progress_a.clone(),
            progress_b.clone(),
        )
        .await;

        progress_a.finish();
        progress_b.finish();

        result
    } else {
        run_until_signal(
            config.seed,
            store_a.clone(),
            store_b.clone(),
            LogProgress::new(store_a.name(), total, LOG_PROGRESS_EVERY),
            LogProgress::new(store_b.name(), total, LOG_PROGRESS_EVERY),
        )
        .await
    };

    // Rows are counted even after a failed run, the stores may have diverged.
    for store in [&store_a, &store_b] {
        match store.count_rows().await {
            Ok(counts) => info!(
                store = store.name(),
                containers = counts.containers,
                groups = counts.groups,
                items = counts.items,
                total = counts.total(),
                "store row counts"
            ),
            Err(err) => warn!(store = store.name(), error = %err, "failed to count rows"),
        }
    }

    store_a.shutdown().await?;
    store_b.shutdown().await?;

    let summary = result?;
    info!(
        expected = summary.expected,
        applied_a = summary.applied_a,
        applied_b = summary.applied_b,
        "seeding finished"
    );

    Ok(())
}

/// Prints the row counts of both stores.
pub async fn count_rows(config: SeederConfig) -> anyhow::Result<()> {
    config.validate()?;

    let (store_a, store_b) = connect_stores(&config).await?;
    count_then_shutdown([&store_a, &store_b]).await?;

    Ok(())
}

/// Logs the row counts of every store, then shuts every store down.
///
/// A failed count does not skip any shutdown. Returns the first error encountered.
async fn count_then_shutdown<S: Store>(stores: [&S; 2]) -> SeedResult<()> {
    let mut first_err = None;

    for store in stores {
        match store.count_rows().await {
            Ok(counts) => info!(
                store = store.name(),
                containers = counts.containers,
                groups = counts.groups,
                items = counts.items,
                "store row counts"
            ),
            Err(err) => {
                warn!(store = store.name(), error = %err, "failed to count rows");
                first_err.get_or_insert(err);
            }
        }
    }

    for store in stores {
        if let Err(err) = store.shutdown().await {
            warn!(store = store.name(), error = %err, "failed to shut down store");
            first_err.get_or_insert(err);
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Runs every read strategy `iterations` times against each SQL store and logs the timings.
///
/// Strategies a store does not support are skipped with a warning.
pub async fn compare_read_strategies(config: SeederConfig, iterations: u32) -> anyhow::Result<()> {
    config.validate()?;

    let (store_a, store_b) = connect_stores(&config).await?;

    for store in [&store_a, &store_b] {
        if store.is_memory() {
            warn!(store = store.name(), "skipping memory store, it has no read strategies");
            continue;
        }

        'strategies: for strategy in ReadStrategy::ALL {
            let mut counts = HierarchyCounts::default();
            let started = Instant::now();

            for _ in 0..iterations {
                match store.read_hierarchy(strategy).await {
                    Ok(forums) => counts = HierarchyCounts::of(&forums),
                    Err(err) => {
                        warn!(
                            store = store.name(),
                            %strategy,
                            error = %err,
                            "read strategy failed, skipping"
                        );
                        continue 'strategies;
                    }
                }
            }

            let elapsed = started.elapsed();
            info!(
                store = store.name(),
                %strategy,
                iterations,
                total_ms = elapsed.as_millis() as u64,
                per_iteration_ms = elapsed.as_millis() as u64 / u64::from(iterations.max(1)),
                %counts,
                "read strategy timing"
            );
        }

        store.shutdown().await?;
    }

    Ok(())
}

async fn connect_stores(
    config: &SeederConfig,
) -> anyhow::Result<(ConfiguredStore, ConfiguredStore)> {
    let store_a = ConfiguredStore::connect("store_a", &config.store_a).await?;
    let store_b = ConfiguredStore::connect("store_b", &config.store_b).await?;

    Ok((store_a, store_b))
}

/// Runs the pipeline, cancelling it on SIGINT or SIGTERM.
async fn run_until_signal<PA, PB>(
    config: SeedConfig,
    store_a: ConfiguredStore,
    store_b: ConfiguredStore,
    progress_a: PA,
    progress_b: PB,
) -> anyhow::Result<RunSummary>
where
    PA: ProgressSink,
    PB: ProgressSink,
{
    let pipeline = SeedPipeline::new(
        config,
        RecordSources::lorem(),
        store_a,
        store_b,
        progress_a,
        progress_b,
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown_tx = pipeline.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, cancelling seed run");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, cancelling seed run");
            }
        }

        shutdown_tx.shutdown();
    });

    let result = pipeline.run().await;

    // The signal task is still waiting when the run ended on its own.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed::bail;
    use seed::error::ErrorKind;
    use seed::store::RowCounts;
    use seed::types::SyntheticRecord;
    use seed_config::shared::{QueueConfig, SeedShapeConfig};
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    /// Store accepting every insert whose row count can be made to fail.
    #[derive(Debug)]
    struct CountOnlyStore {
        name: &'static str,
        fail_count: bool,
        shut_down: AtomicBool,
    }

    impl CountOnlyStore {
        fn new(name: &'static str, fail_count: bool) -> Self {
            Self {
                name,
                fail_count,
                shut_down: AtomicBool::new(false),
            }
        }

        fn is_shut_down(&self) -> bool {
            self.shut_down.load(Ordering::SeqCst)
        }
    }

    impl Store for CountOnlyStore {
        fn name(&self) -> &str {
            self.name
        }

        async fn shutdown(&self) -> SeedResult<()> {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn insert_container(&self, _record: &SyntheticRecord) -> SeedResult<()> {
            Ok(())
        }

        async fn insert_group(
            &self,
            _container_id: Uuid,
            _record: &SyntheticRecord,
        ) -> SeedResult<()> {
            Ok(())
        }

        async fn insert_item(&self, _group_id: Uuid, _record: &SyntheticRecord) -> SeedResult<()> {
            Ok(())
        }

        async fn count_rows(&self) -> SeedResult<RowCounts> {
            if self.fail_count {
                bail!(ErrorKind::StoreQueryFailed, "Injected count failure", self.name);
            }

            Ok(RowCounts::default())
        }
    }

    #[tokio::test]
    async fn failed_count_still_shuts_down_both_stores() {
        let store_a = CountOnlyStore::new("a", true);
        let store_b = CountOnlyStore::new("b", true);

        let err = count_then_shutdown([&store_a, &store_b]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreQueryFailed);
        assert_eq!(err.detail(), Some("a"));
        assert!(store_a.is_shut_down());
        assert!(store_b.is_shut_down());
    }

    #[tokio::test]
    async fn successful_counts_shut_down_both_stores() {
        let store_a = CountOnlyStore::new("a", false);
        let store_b = CountOnlyStore::new("b", false);

        count_then_shutdown([&store_a, &store_b]).await.unwrap();

        assert!(store_a.is_shut_down());
        assert!(store_b.is_shut_down());
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut config = SeedConfig {
            shape: SeedShapeConfig {
                container_count: 100,
                groups_per_container: 1000,
                items_per_group: 10,
            },
            queues: QueueConfig::default(),
            deadline_ms: Some(5),
        };

        ShapeOverrides {
            container_count: Some(2),
            items_per_group: Some(3),
            ..ShapeOverrides::default()
        }
        .apply(&mut config);

        assert_eq!(config.shape.container_count, 2);
        assert_eq!(config.shape.groups_per_container, 1000);
        assert_eq!(config.shape.items_per_group, 3);
        assert_eq!(config.deadline_ms, Some(5));
    }
}
