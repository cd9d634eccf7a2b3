#![cfg(feature = "test-utils")]

use seed::error::ErrorKind;
use seed::generator::{LoremSource, RecordSources};
use seed::pipeline::SeedPipeline;
use seed::store::Store;
use seed::store::memory::MemoryStore;
use seed::test_utils::hierarchy::{check_ordering, expected_levels, is_prefix};
use seed::test_utils::progress::CountingProgress;
use seed::test_utils::seed_config;
use seed::test_utils::source::FailingSource;
use seed::test_utils::store::FaultyStore;
use seed::types::RecordLevel;
use seed_config::shared::QueueConfig;
use seed_telemetry::tracing::init_test_tracing;
use std::time::Duration;

const RUN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::test(flavor = "multi_thread")]
async fn both_stores_receive_the_same_ordered_hierarchy() {
    init_test_tracing();

    let config = seed_config(3, 3, 3);
    let store_a = MemoryStore::new("a");
    let store_b = MemoryStore::new("b");

    let summary = tokio::time::timeout(
        RUN_TIMEOUT,
        SeedPipeline::new(
            config.clone(),
            RecordSources::lorem(),
            store_a.clone(),
            store_b.clone(),
            CountingProgress::new(),
            CountingProgress::new(),
        )
        .run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(summary.expected, 39);
    assert_eq!(summary.applied_a, 39);
    assert_eq!(summary.applied_b, 39);

    let commands_a = store_a.commands().await;
    let commands_b = store_b.commands().await;
    assert_eq!(commands_a, commands_b);
    check_ordering(&commands_a).unwrap();
    assert_eq!(
        commands_a.iter().map(|c| c.level()).collect::<Vec<_>>(),
        expected_levels(&config.shape)
    );

    let counts = store_b.count_rows().await.unwrap();
    assert_eq!(counts.containers, 3);
    assert_eq!(counts.groups, 9);
    assert_eq!(counts.items, 27);
}

#[tokio::test(flavor = "multi_thread")]
async fn single_slot_queues_still_complete() {
    init_test_tracing();

    let mut config = seed_config(4, 3, 5);
    config.queues = QueueConfig {
        container_capacity: 1,
        group_capacity: 1,
        item_capacity: 1,
        command_capacity: 1,
    };
    let store_a = MemoryStore::new("a");
    let store_b = MemoryStore::new("b");

    let summary = tokio::time::timeout(
        RUN_TIMEOUT,
        SeedPipeline::new(
            config,
            RecordSources::lorem_with_seed(3),
            store_a.clone(),
            store_b.clone(),
            CountingProgress::new(),
            CountingProgress::new(),
        )
        .run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(summary.applied_a, 76);
    assert_eq!(store_a.commands().await, store_b.commands().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_failure_in_one_store_stops_the_other() {
    init_test_tracing();

    let store_a = FaultyStore::new("a").failing_at(5);
    let store_b = FaultyStore::new("b").with_delay(Duration::from_millis(5));
    let progress_a = CountingProgress::new();

    let pipeline = SeedPipeline::new(
        seed_config(5, 5, 5),
        RecordSources::lorem(),
        store_a.clone(),
        store_b.clone(),
        progress_a.clone(),
        CountingProgress::new(),
    );
    store_b.observe_shutdown(pipeline.shutdown_tx().subscribe());

    let err = tokio::time::timeout(RUN_TIMEOUT, pipeline.run())
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StoreInsertFailed);
    assert_eq!(progress_a.count(), 4);
    assert!(store_b.started_after_shutdown() <= 1);

    let commands_a = store_a.commands().await;
    let commands_b = store_b.commands().await;
    assert_eq!(commands_a.len(), 4);
    check_ordering(&commands_b).unwrap();
    assert!(is_prefix(&commands_a, &commands_b) || is_prefix(&commands_b, &commands_a));
}

#[tokio::test(flavor = "multi_thread")]
async fn failures_in_both_stores_report_a_single_error() {
    init_test_tracing();

    let err = tokio::time::timeout(
        RUN_TIMEOUT,
        SeedPipeline::new(
            seed_config(2, 2, 2),
            RecordSources::lorem(),
            FaultyStore::new("a").failing_at(3),
            FaultyStore::new("b")
                .with_delay(Duration::from_millis(5))
                .failing_at(10),
            CountingProgress::new(),
            CountingProgress::new(),
        )
        .run(),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StoreInsertFailed);
    assert!(
        err.detail()
            .is_some_and(|detail| detail == "insert 3 of store a"),
        "unexpected detail: {:?}",
        err.detail()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn generation_failure_fails_the_run() {
    init_test_tracing();

    let sources = RecordSources {
        containers: Box::new(LoremSource::new(RecordLevel::Container)),
        groups: Box::new(LoremSource::new(RecordLevel::Group)),
        items: Box::new(FailingSource::new(RecordLevel::Item, 3)),
    };
    let store_a = MemoryStore::new("a");
    let store_b = MemoryStore::new("b");

    let err = tokio::time::timeout(
        RUN_TIMEOUT,
        SeedPipeline::new(
            seed_config(2, 2, 2),
            sources,
            store_a.clone(),
            store_b.clone(),
            CountingProgress::new(),
            CountingProgress::new(),
        )
        .run(),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::GenerationFailed);

    let commands_a = store_a.commands().await;
    let items = commands_a
        .iter()
        .filter(|c| c.level() == RecordLevel::Item)
        .count();
    assert!(items <= 3);
    check_ordering(&commands_a).unwrap();
    check_ordering(&store_b.commands().await).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn external_shutdown_cancels_the_run() {
    init_test_tracing();

    let store_a = FaultyStore::new("a").with_delay(Duration::from_millis(1));
    let store_b = FaultyStore::new("b").with_delay(Duration::from_millis(1));

    let pipeline = SeedPipeline::new(
        seed_config(50, 50, 50),
        RecordSources::lorem(),
        store_a.clone(),
        store_b.clone(),
        CountingProgress::new(),
        CountingProgress::new(),
    );
    let shutdown_tx = pipeline.shutdown_tx();
    let run = tokio::spawn(pipeline.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.shutdown();

    let err = tokio::time::timeout(RUN_TIMEOUT, run)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RunCancelled);

    let commands_a = store_a.commands().await;
    let commands_b = store_b.commands().await;
    check_ordering(&commands_a).unwrap();
    check_ordering(&commands_b).unwrap();
    assert!(is_prefix(&commands_a, &commands_b) || is_prefix(&commands_b, &commands_a));
}

#[tokio::test(flavor = "multi_thread")]
async fn dropping_the_run_future_stops_the_stores() {
    init_test_tracing();

    let store_a = FaultyStore::new("a").with_delay(Duration::from_millis(5));
    let store_b = FaultyStore::new("b").with_delay(Duration::from_millis(5));

    let pipeline = SeedPipeline::new(
        seed_config(5, 5, 5),
        RecordSources::lorem(),
        store_a.clone(),
        store_b.clone(),
        CountingProgress::new(),
        CountingProgress::new(),
    );
    let shutdown_tx = pipeline.shutdown_tx();
    store_a.observe_shutdown(shutdown_tx.subscribe());
    store_b.observe_shutdown(shutdown_tx.subscribe());

    let result = tokio::time::timeout(Duration::from_millis(30), pipeline.run()).await;
    assert!(result.is_err());
    assert!(shutdown_tx.is_shutdown());

    // Lets the insert in flight when the run was dropped finish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let attempts_a = store_a.attempts();
    let attempts_b = store_b.attempts();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(store_a.attempts(), attempts_a);
    assert_eq!(store_b.attempts(), attempts_b);
    assert!(attempts_a < 155);
    assert!(store_a.started_after_shutdown() <= 1);
    assert!(store_b.started_after_shutdown() <= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn panicking_store_is_reported_as_worker_panic() {
    init_test_tracing();

    let err = tokio::time::timeout(
        RUN_TIMEOUT,
        SeedPipeline::new(
            seed_config(2, 2, 2),
            RecordSources::lorem(),
            MemoryStore::new("a"),
            FaultyStore::new("b").panicking_at(2),
            CountingProgress::new(),
            CountingProgress::new(),
        )
        .run(),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IngestWorkerPanic);
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_at_any_command_terminates_the_run() {
    init_test_tracing();

    let config = seed_config(2, 2, 2);
    let total = config.shape.total_work_units();

    for attempt in 1..=total {
        let store_a = FaultyStore::new("a");
        let store_b = FaultyStore::new("b").failing_at(attempt);

        let err = tokio::time::timeout(
            RUN_TIMEOUT,
            SeedPipeline::new(
                config.clone(),
                RecordSources::lorem(),
                store_a.clone(),
                store_b.clone(),
                CountingProgress::new(),
                CountingProgress::new(),
            )
            .run(),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StoreInsertFailed, "attempt {attempt}");
        assert_eq!(store_b.commands().await.len() as u64, attempt - 1);
        check_ordering(&store_a.commands().await).unwrap();
    }
}
