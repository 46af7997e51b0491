use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use harvest_core::testutil::{
    MockFetcher, MockResponse, RecordingProgressReporter, RecordingWorkerReporter,
};
use harvest_core::{AppError, Engine, OutcomeStatus, RunCounters, TracingWorkerReporter};

use crate::common::{config, expected_status, sparse_fetcher, target};

fn expected_counters(start: u64, end: u64) -> RunCounters {
    let mut counters = RunCounters::default();
    for id in start..=end {
        counters.record(expected_status(id));
    }
    counters
}

#[tokio::test]
async fn every_id_yields_exactly_one_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(sparse_fetcher(), config(dir.path(), 0, 499, 10)).unwrap();
    let reporter = RecordingProgressReporter::new();

    let summary = engine
        .run_with(Arc::new(TracingWorkerReporter), reporter.clone())
        .await
        .unwrap();

    let recorded = reporter.log().recorded;
    assert_eq!(recorded.len(), 500);
    let unique: HashSet<u64> = recorded.iter().copied().collect();
    assert_eq!(unique, (0..=499).collect::<HashSet<_>>());

    assert_eq!(summary.counters, expected_counters(0, 499));
    assert!(summary.counters.is_consistent());
}

#[tokio::test]
async fn progress_checkpoints_are_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(sparse_fetcher(), config(dir.path(), 1, 450, 8)).unwrap();
    let reporter = RecordingProgressReporter::new();

    engine
        .run_with(Arc::new(TracingWorkerReporter), reporter.clone())
        .await
        .unwrap();

    let log = reporter.log();
    let checkpoints: Vec<u64> = log.progress.iter().map(|c| c.processed).collect();
    assert_eq!(checkpoints, vec![100, 200, 300, 400]);
    assert!(log.progress.iter().all(RunCounters::is_consistent));
    assert_eq!(log.finished.map(|c| c.processed), Some(450));
}

#[tokio::test]
async fn worker_count_does_not_change_counters() {
    let single_dir = tempfile::tempdir().unwrap();
    let pooled_dir = tempfile::tempdir().unwrap();

    let single = Engine::new(sparse_fetcher(), config(single_dir.path(), 0, 199, 1))
        .unwrap()
        .run()
        .await
        .unwrap();
    let pooled = Engine::new(sparse_fetcher(), config(pooled_dir.path(), 0, 199, 10))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(single.counters, pooled.counters);
    assert_eq!(single.counters, expected_counters(0, 199));
}

#[tokio::test]
async fn empty_range_shuts_down_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MockFetcher::new();
    let engine = Engine::new(fetcher.clone(), config(dir.path(), 10, 5, 10)).unwrap();
    let workers = Arc::new(RecordingWorkerReporter::new());

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run_with(Arc::clone(&workers), RecordingProgressReporter::new()),
    )
    .await
    .expect("engine must not hang on an empty range")
    .unwrap();

    assert_eq!(summary.counters, RunCounters::default());
    assert_eq!(fetcher.total_calls(), 0);
    assert_eq!(workers.count("started"), 10);
    assert_eq!(workers.count("stopped"), 10);
}

#[tokio::test]
async fn only_successful_ids_leave_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(sparse_fetcher(), config(dir.path(), 0, 99, 6)).unwrap();

    engine.run().await.unwrap();

    let on_disk: HashSet<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let expected: HashSet<String> = (0..=99)
        .filter(|id| expected_status(*id) == OutcomeStatus::Succeeded)
        .map(|id| format!("doc_{id}.pdf"))
        .collect();
    assert_eq!(on_disk, expected);
}

#[tokio::test]
async fn retry_counts_follow_classification() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = MockFetcher::new()
        .with_script(&target(1), vec![MockResponse::NotFound])
        .with_script(
            &target(2),
            vec![
                MockResponse::Timeout,
                MockResponse::Fail("HTTP 502".into()),
                MockResponse::Body(b"third time".to_vec()),
            ],
        )
        .with_script(&target(3), vec![MockResponse::Fail("HTTP 500".into()); 3]);
    let engine = Engine::new(fetcher.clone(), config(dir.path(), 1, 3, 3)).unwrap();
    let reporter = RecordingProgressReporter::new();

    let summary = engine
        .run_with(Arc::new(TracingWorkerReporter), reporter.clone())
        .await
        .unwrap();

    assert_eq!(fetcher.calls(&target(1)), 1);
    assert_eq!(fetcher.calls(&target(2)), 3);
    assert_eq!(fetcher.calls(&target(3)), 3);
    assert_eq!(summary.counters.not_found, 1);
    assert_eq!(summary.counters.succeeded, 1);
    assert_eq!(summary.counters.failed, 1);
    assert!(dir.path().join("doc_2.pdf").exists());
    assert!(!dir.path().join("doc_1.pdf").exists());
    assert!(!dir.path().join("doc_3.pdf").exists());
}

#[tokio::test]
async fn tiny_queues_still_drain() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(
        sparse_fetcher(),
        config(dir.path(), 0, 149, 10).with_queue_capacity(1),
    )
    .unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(30), engine.run())
        .await
        .expect("backpressure must not deadlock")
        .unwrap();

    assert_eq!(summary.counters, expected_counters(0, 149));
}

#[tokio::test]
async fn unusable_output_dir_aborts_before_any_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let fetcher = MockFetcher::new();
    let engine = Engine::new(fetcher.clone(), config(&blocker.join("out"), 0, 9, 2)).unwrap();

    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, AppError::StorageError(_)), "{err}");
    assert_eq!(fetcher.total_calls(), 0);
}
