//! Result aggregation: the single owner of the run counters.
//!
//! Outcomes arrive in completion order, not identifier order. Counters are
//! plain sums, so arrival order does not affect the totals.

use tokio::sync::mpsc;

use crate::models::{Outcome, OutcomeStatus, RunCounters};

/// Events emitted by the aggregator.
#[derive(Debug, Clone)]
pub enum ProgressEvent<'a> {
    /// One outcome was counted; `counters` already include it.
    Recorded {
        outcome: &'a Outcome,
        counters: &'a RunCounters,
    },
    /// Periodic tally of not-found outcomes, which are not reported one by one.
    NotFoundTally { not_found: u64 },
    /// Periodic snapshot of all counters.
    Progress { counters: &'a RunCounters },
    /// The result queue is closed and drained.
    Finished { counters: &'a RunCounters },
}

/// Receives aggregator events. Called from the aggregator only, never
/// concurrently.
pub trait ProgressReporter: Send {
    fn report(&mut self, event: ProgressEvent<'_>) {
        let _ = event;
    }
}

impl<R: ProgressReporter + ?Sized> ProgressReporter for &mut R {
    fn report(&mut self, event: ProgressEvent<'_>) {
        (**self).report(event);
    }
}

impl<A: ProgressReporter, B: ProgressReporter> ProgressReporter for (A, B) {
    fn report(&mut self, event: ProgressEvent<'_>) {
        self.0.report(event.clone());
        self.1.report(event);
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressReporter;

impl ProgressReporter for TracingProgressReporter {
    fn report(&mut self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::Recorded { outcome, .. } => match outcome.status {
                OutcomeStatus::Succeeded => {
                    tracing::info!(id = outcome.id, attempts = outcome.attempts, "{}", outcome.detail);
                }
                OutcomeStatus::Failed => {
                    tracing::warn!(id = outcome.id, "{}", outcome.detail);
                }
                OutcomeStatus::NotFound => {}
            },
            ProgressEvent::NotFoundTally { not_found } => {
                tracing::info!("... {} not found so far ...", not_found);
            }
            ProgressEvent::Progress { counters } => {
                tracing::info!("=== Progress: {} ===", counters);
            }
            ProgressEvent::Finished { counters } => {
                tracing::info!(
                    processed = counters.processed,
                    succeeded = counters.succeeded,
                    not_found = counters.not_found,
                    failed = counters.failed,
                    "=== Final results ==="
                );
            }
        }
    }
}

/// Consumes outcomes and maintains the run counters.
pub struct Aggregator<R: ProgressReporter> {
    reporter: R,
    interval: u64,
    counters: RunCounters,
}

impl<R: ProgressReporter> Aggregator<R> {
    /// `interval` controls both progress snapshots and not-found tallies.
    pub fn new(reporter: R, interval: u64) -> Self {
        Self {
            reporter,
            interval: interval.max(1),
            counters: RunCounters::default(),
        }
    }

    /// Count every outcome until the result queue is closed and drained,
    /// then report and return the final counters.
    pub async fn run(mut self, mut results: mpsc::Receiver<Outcome>) -> RunCounters {
        while let Some(outcome) = results.recv().await {
            self.record(&outcome);
        }

        self.reporter.report(ProgressEvent::Finished {
            counters: &self.counters,
        });
        self.counters
    }

    fn record(&mut self, outcome: &Outcome) {
        self.counters.record(outcome.status);
        self.reporter.report(ProgressEvent::Recorded {
            outcome,
            counters: &self.counters,
        });

        if outcome.status == OutcomeStatus::NotFound
            && self.counters.not_found % self.interval == 0
        {
            self.reporter.report(ProgressEvent::NotFoundTally {
                not_found: self.counters.not_found,
            });
        }

        if self.counters.processed % self.interval == 0 {
            self.reporter.report(ProgressEvent::Progress {
                counters: &self.counters,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testutil::RecordingProgressReporter;

    fn outcome(id: u64, status: OutcomeStatus) -> Outcome {
        let err = AppError::Generic("x".into());
        let mut outcome = Outcome::failed(id, 1, &err);
        outcome.status = status;
        outcome
    }

    fn status_for(id: u64) -> OutcomeStatus {
        match id % 4 {
            0 => OutcomeStatus::Succeeded,
            3 => OutcomeStatus::Failed,
            _ => OutcomeStatus::NotFound,
        }
    }

    #[tokio::test]
    async fn counts_every_outcome_once() {
        let reporter = RecordingProgressReporter::new();
        let (tx, rx) = mpsc::channel(16);
        let aggregator = tokio::spawn(Aggregator::new(reporter.clone(), 100).run(rx));

        for id in 0..250u64 {
            tx.send(outcome(id, status_for(id))).await.unwrap();
        }
        drop(tx);

        let counters = aggregator.await.unwrap();
        assert_eq!(counters.processed, 250);
        assert_eq!(counters.succeeded, 63);
        assert_eq!(counters.failed, 62);
        assert_eq!(counters.not_found, 125);
        assert!(counters.is_consistent());

        let log = reporter.log();
        assert_eq!(log.recorded.len(), 250);
        assert_eq!(log.finished, Some(counters));
    }

    #[tokio::test]
    async fn progress_every_interval_is_consistent() {
        let reporter = RecordingProgressReporter::new();
        let (tx, rx) = mpsc::channel(16);
        let aggregator = tokio::spawn(Aggregator::new(reporter.clone(), 100).run(rx));

        for id in 0..350u64 {
            tx.send(outcome(id, status_for(id))).await.unwrap();
        }
        drop(tx);
        aggregator.await.unwrap();

        let log = reporter.log();
        let processed: Vec<u64> = log.progress.iter().map(|c| c.processed).collect();
        assert_eq!(processed, vec![100, 200, 300]);
        assert!(log.progress.iter().all(RunCounters::is_consistent));
    }

    #[tokio::test]
    async fn not_found_is_tallied_periodically() {
        let reporter = RecordingProgressReporter::new();
        let (tx, rx) = mpsc::channel(16);
        let aggregator = tokio::spawn(Aggregator::new(reporter.clone(), 10).run(rx));

        for id in 0..25u64 {
            tx.send(outcome(id, OutcomeStatus::NotFound)).await.unwrap();
        }
        tx.send(outcome(25, OutcomeStatus::Succeeded)).await.unwrap();
        drop(tx);
        aggregator.await.unwrap();

        assert_eq!(reporter.log().not_found_tallies, vec![10, 20]);
    }

    #[tokio::test]
    async fn empty_stream_finishes_with_zero_counters() {
        let reporter = RecordingProgressReporter::new();
        let (tx, rx) = mpsc::channel::<Outcome>(1);
        drop(tx);

        let counters = Aggregator::new(reporter.clone(), 100).run(rx).await;

        assert_eq!(counters, RunCounters::default());
        assert_eq!(reporter.log().finished, Some(RunCounters::default()));
        assert!(reporter.log().progress.is_empty());
    }

    #[tokio::test]
    async fn paired_reporters_both_receive_events() {
        let first = RecordingProgressReporter::new();
        let second = RecordingProgressReporter::new();
        let (tx, rx) = mpsc::channel(4);
        tx.send(outcome(1, OutcomeStatus::Succeeded)).await.unwrap();
        drop(tx);

        Aggregator::new((first.clone(), second.clone()), 100)
            .run(rx)
            .await;

        assert_eq!(first.log().recorded, vec![1]);
        assert_eq!(second.log().recorded, vec![1]);
    }
}
