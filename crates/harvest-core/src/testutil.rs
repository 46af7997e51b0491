//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing test
//! assertions on recorded calls and events.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::aggregator::{ProgressEvent, ProgressReporter};
use crate::error::AppError;
use crate::models::{FetchedArtifact, RunCounters, compute_hash};
use crate::traits::Fetcher;
use crate::worker::{WorkerEvent, WorkerReporter};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// One scripted fetch result.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Write the payload to the destination and succeed.
    Body(Vec<u8>),
    NotFound,
    /// Transient failure with the given message.
    Fail(String),
    Timeout,
    /// Write the payload, then fail without cleaning up after itself.
    PartialThenFail(Vec<u8>),
}

type ResponseRule = Arc<dyn Fn(&str) -> MockResponse + Send + Sync>;
type LatencyRule = Arc<dyn Fn(&str) -> Duration + Send + Sync>;

#[derive(Default)]
struct MockFetcherState {
    scripts: HashMap<String, VecDeque<MockResponse>>,
    calls: HashMap<String, usize>,
}

/// Mock fetcher with per-target scripted responses.
///
/// Each call pops the next scripted response for its target. Targets without
/// a remaining script fall back to the rule (if set) or to a small default
/// payload.
#[derive(Clone)]
pub struct MockFetcher {
    state: Arc<Mutex<MockFetcherState>>,
    rule: Option<ResponseRule>,
    latency: Option<LatencyRule>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockFetcherState::default())),
            rule: None,
            latency: None,
        }
    }

    pub fn with_script(self, target: &str, responses: Vec<MockResponse>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(target.to_string(), responses.into());
        self
    }

    /// Derive the response from the target for unscripted calls.
    pub fn with_rule(mut self, rule: impl Fn(&str) -> MockResponse + Send + Sync + 'static) -> Self {
        self.rule = Some(Arc::new(rule));
        self
    }

    /// Delay every call by a per-target duration before responding.
    pub fn with_latency(
        mut self,
        latency: impl Fn(&str) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Some(Arc::new(latency));
        self
    }

    /// Number of calls made for `target`.
    pub fn calls(&self, target: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(target)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.values().sum()
    }

    fn next_response(&self, target: &str) -> MockResponse {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(target.to_string()).or_default() += 1;

        if let Some(response) = state.scripts.get_mut(target).and_then(VecDeque::pop_front) {
            return response;
        }
        drop(state);

        match &self.rule {
            Some(rule) => rule(target),
            None => MockResponse::Body(b"mock payload".to_vec()),
        }
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, target: &str, destination: &Path) -> Result<FetchedArtifact, AppError> {
        let response = self.next_response(target);

        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(target)).await;
        }

        match response {
            MockResponse::Body(body) => {
                tokio::fs::write(destination, &body).await?;
                Ok(FetchedArtifact {
                    path: destination.to_path_buf(),
                    bytes: body.len() as u64,
                    sha256: compute_hash(&body),
                    content_type: Some("application/pdf".to_string()),
                })
            }
            MockResponse::NotFound => Err(AppError::NotFound(format!("HTTP 404 for {target}"))),
            MockResponse::Fail(message) => Err(AppError::HttpError(message)),
            MockResponse::Timeout => Err(AppError::Timeout(Duration::from_secs(30))),
            MockResponse::PartialThenFail(body) => {
                tokio::fs::write(destination, &body).await?;
                Err(AppError::NetworkError("connection reset mid-body".into()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingProgressReporter
// ---------------------------------------------------------------------------

/// Everything a [`RecordingProgressReporter`] has seen.
#[derive(Debug, Default, Clone)]
pub struct ProgressLog {
    /// Identifiers in the order the aggregator recorded them.
    pub recorded: Vec<u64>,
    pub progress: Vec<RunCounters>,
    pub not_found_tallies: Vec<u64>,
    pub finished: Option<RunCounters>,
}

/// Progress reporter that records every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingProgressReporter {
    log: Arc<Mutex<ProgressLog>>,
}

impl RecordingProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> ProgressLog {
        self.log.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn report(&mut self, event: ProgressEvent<'_>) {
        let mut log = self.log.lock().unwrap();
        match event {
            ProgressEvent::Recorded { outcome, .. } => log.recorded.push(outcome.id),
            ProgressEvent::NotFoundTally { not_found } => log.not_found_tallies.push(not_found),
            ProgressEvent::Progress { counters } => log.progress.push(*counters),
            ProgressEvent::Finished { counters } => log.finished = Some(*counters),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingWorkerReporter
// ---------------------------------------------------------------------------

/// Worker reporter that counts lifecycle events.
#[derive(Clone, Default)]
pub struct RecordingWorkerReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingWorkerReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == kind)
            .count()
    }
}

impl WorkerReporter for RecordingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        let kind = match event {
            WorkerEvent::Started { .. } => "started",
            WorkerEvent::JobStarted { .. } => "job_started",
            WorkerEvent::JobFinished { .. } => "job_finished",
            WorkerEvent::Stopped { .. } => "stopped",
        };
        self.events.lock().unwrap().push(kind.to_string());
    }
}
