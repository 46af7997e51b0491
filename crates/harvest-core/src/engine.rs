//! The driver: wires job source, worker pool and aggregator together and owns
//! the shutdown sequence.
//!
//! ```text
//! JobSource --(jobs, bounded)--> WorkerPool x N --(outcomes, bounded)--> Aggregator
//! ```
//!
//! Shutdown order:
//! 1. the job source drops its sender once the range is exhausted;
//! 2. each worker exits when the job queue is drained and closed;
//! 3. the driver joins every worker, then drops the last result sender;
//! 4. the aggregator sees the closed result queue and returns its counters.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::aggregator::{Aggregator, ProgressReporter, TracingProgressReporter};
use crate::error::AppError;
use crate::job::EngineConfig;
use crate::models::{Outcome, RunSummary};
use crate::source::JobSource;
use crate::traits::Fetcher;
use crate::worker::{TracingWorkerReporter, WorkerContext, WorkerPool, WorkerReporter};

/// Bounded concurrent fetch engine.
///
/// Generic over the [`Fetcher`] so it can be driven without real HTTP.
pub struct Engine<F: Fetcher> {
    fetcher: F,
    config: EngineConfig,
}

impl<F: Fetcher> Engine<F> {
    pub fn new(fetcher: F, config: EngineConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self { fetcher, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run to completion, reporting through `tracing`.
    pub async fn run(&self) -> Result<RunSummary, AppError> {
        self.run_with(Arc::new(TracingWorkerReporter), TracingProgressReporter)
            .await
    }

    /// Run every identifier of the configured range to a terminal outcome.
    ///
    /// Per-job failures never fail the run. Errors are returned only when the
    /// output directory cannot be created, a worker task dies, or the final
    /// counters do not cover the whole range.
    pub async fn run_with<WR, PR>(
        &self,
        worker_reporter: Arc<WR>,
        progress_reporter: PR,
    ) -> Result<RunSummary, AppError>
    where
        WR: WorkerReporter + 'static,
        PR: ProgressReporter,
    {
        let config = &self.config;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let expected = config.range.len();

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|e| {
                AppError::StorageError(format!(
                    "Failed to create output directory {}: {e}",
                    config.output_dir.display()
                ))
            })?;

        tracing::info!(
            %run_id,
            start = config.range.start,
            end = config.range.end,
            jobs = expected,
            workers = config.workers,
            output_dir = %config.output_dir.display(),
            "Starting run"
        );

        let (job_tx, job_rx) = mpsc::channel(config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel::<Outcome>(config.queue_capacity);

        let context = WorkerContext {
            fetcher: self.fetcher.clone(),
            retry: config.retry.clone(),
            output_dir: config.output_dir.clone(),
            naming: config.naming.clone(),
        };
        let pool = WorkerPool::spawn(
            config.workers,
            job_rx,
            &result_tx,
            context,
            worker_reporter,
        );
        let source = JobSource::new(config.range, config.target.clone()).spawn(job_tx);

        let aggregator = Aggregator::new(progress_reporter, config.progress_interval);
        let (counters, workers_joined) = tokio::join!(aggregator.run(result_rx), async move {
            let joined = pool.join().await;
            // Every worker has exited; the result queue may close now.
            drop(result_tx);
            joined
        });

        let handled = workers_joined?;
        let emitted = source
            .await
            .map_err(|e| AppError::WorkerPanicked(format!("job source: {e}")))?;

        if emitted != expected
            || handled != expected
            || counters.processed != expected
            || !counters.is_consistent()
        {
            tracing::error!(
                %run_id,
                expected,
                emitted,
                handled,
                processed = counters.processed,
                "Run finished with missing outcomes"
            );
            return Err(AppError::Incomplete {
                expected,
                processed: counters.processed,
            });
        }

        let summary = RunSummary {
            run_id,
            range: config.range,
            workers: config.workers,
            started_at,
            finished_at: Utc::now(),
            counters,
        };
        tracing::info!(%run_id, "Run complete: {}", summary.counters);
        Ok(summary)
    }
}
