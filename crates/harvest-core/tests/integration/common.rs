use std::path::Path;
use std::time::Duration;

use harvest_core::testutil::{MockFetcher, MockResponse};
use harvest_core::{EngineConfig, IdRange, OutcomeStatus, RetryPolicy, TargetTemplate};

pub const TEMPLATE: &str = "mock://docs/{id}";

pub fn target(id: u64) -> String {
    format!("mock://docs/{id}")
}

pub fn id_of(target: &str) -> u64 {
    target
        .rsplit('/')
        .next()
        .and_then(|s| s.parse().ok())
        .expect("mock target ends with an id")
}

/// Sparse id space: multiples of 3 are absent, other multiples of 7 always
/// fail (leaving partial files behind), the rest succeed.
pub fn expected_status(id: u64) -> OutcomeStatus {
    if id % 3 == 0 {
        OutcomeStatus::NotFound
    } else if id % 7 == 0 {
        OutcomeStatus::Failed
    } else {
        OutcomeStatus::Succeeded
    }
}

pub fn sparse_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_rule(|target| {
            let id = id_of(target);
            match expected_status(id) {
                OutcomeStatus::NotFound => MockResponse::NotFound,
                OutcomeStatus::Failed => MockResponse::PartialThenFail(b"%PDF-".to_vec()),
                OutcomeStatus::Succeeded => MockResponse::Body(format!("doc {id}").into_bytes()),
            }
        })
        // Vary completion time so outcomes arrive out of id order.
        .with_latency(|target| Duration::from_micros((id_of(target) * 37) % 500))
}

pub fn config(dir: &Path, start: u64, end: u64, workers: usize) -> EngineConfig {
    EngineConfig::new(TargetTemplate::new(TEMPLATE).unwrap())
        .with_range(IdRange::new(start, end))
        .with_workers(workers)
        .with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
        .with_output_dir(dir)
}
