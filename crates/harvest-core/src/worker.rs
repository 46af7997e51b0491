use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::error::AppError;
use crate::job::{ArtifactNaming, Job};
use crate::models::{Outcome, OutcomeStatus};
use crate::retry::RetryPolicy;
use crate::traits::Fetcher;

/// Events emitted by workers for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: usize,
    },
    JobStarted {
        worker_id: usize,
        job: &'a Job,
    },
    JobFinished {
        worker_id: usize,
        outcome: &'a Outcome,
    },
    Stopped {
        worker_id: usize,
        jobs_processed: u64,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::debug!(worker_id, "Worker started");
            }
            WorkerEvent::JobStarted { worker_id, job } => {
                tracing::trace!(worker_id, id = job.id, target = %job.target, "Fetching");
            }
            WorkerEvent::JobFinished { worker_id, outcome } => {
                if outcome.status != OutcomeStatus::NotFound {
                    tracing::debug!(
                        worker_id,
                        id = outcome.id,
                        status = %outcome.status,
                        attempts = outcome.attempts,
                        "Job finished"
                    );
                }
            }
            WorkerEvent::Stopped {
                worker_id,
                jobs_processed,
            } => {
                tracing::debug!(worker_id, jobs_processed, "Worker stopped");
            }
        }
    }
}

/// Everything a worker needs to turn a job into an outcome.
#[derive(Debug, Clone)]
pub struct WorkerContext<F: Fetcher> {
    pub fetcher: F,
    pub retry: RetryPolicy,
    pub output_dir: PathBuf,
    pub naming: ArtifactNaming,
}

/// Job receiver shared by all workers; whoever takes a job owns it.
type SharedJobs = Arc<Mutex<mpsc::Receiver<Job>>>;

/// A fixed set of worker tasks draining one job queue.
pub struct WorkerPool {
    workers: JoinSet<u64>,
    size: usize,
}

impl WorkerPool {
    /// Start exactly `size` workers.
    ///
    /// Each worker holds its own clone of `results`; the caller keeps the
    /// original and must drop it only after [`join`](Self::join) returns.
    pub fn spawn<F, WR>(
        size: usize,
        jobs: mpsc::Receiver<Job>,
        results: &mpsc::Sender<Outcome>,
        context: WorkerContext<F>,
        reporter: Arc<WR>,
    ) -> Self
    where
        F: Fetcher,
        WR: WorkerReporter + 'static,
    {
        let jobs: SharedJobs = Arc::new(Mutex::new(jobs));
        let mut workers = JoinSet::new();

        for worker_id in 0..size {
            let worker = Worker {
                id: worker_id,
                context: context.clone(),
            };
            workers.spawn(worker.run(
                Arc::clone(&jobs),
                results.clone(),
                Arc::clone(&reporter),
            ));
        }

        Self { workers, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to exit. Returns the total number of jobs the
    /// workers processed, or the first task failure once all have exited.
    pub async fn join(mut self) -> Result<u64, AppError> {
        let mut processed = 0u64;
        let mut first_error: Option<AppError> = None;

        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(n) => processed += n,
                Err(join_err) => {
                    tracing::error!(error = %join_err, "Worker task failed");
                    if first_error.is_none() {
                        first_error = Some(AppError::WorkerPanicked(join_err.to_string()));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }
}

struct Worker<F: Fetcher> {
    id: usize,
    context: WorkerContext<F>,
}

impl<F: Fetcher> Worker<F> {
    /// Take jobs until the queue is drained and closed, emitting one outcome
    /// per job.
    async fn run<WR: WorkerReporter>(
        self,
        jobs: SharedJobs,
        results: mpsc::Sender<Outcome>,
        reporter: Arc<WR>,
    ) -> u64 {
        reporter.report(WorkerEvent::Started { worker_id: self.id });

        let mut processed = 0u64;
        while let Some(job) = next_job(&jobs).await {
            reporter.report(WorkerEvent::JobStarted {
                worker_id: self.id,
                job: &job,
            });

            let destination = self
                .context
                .naming
                .path_for(&self.context.output_dir, job.id);
            let outcome = self
                .context
                .retry
                .execute(&self.context.fetcher, &job, &destination)
                .await;

            reporter.report(WorkerEvent::JobFinished {
                worker_id: self.id,
                outcome: &outcome,
            });
            processed += 1;

            if results.send(outcome).await.is_err() {
                tracing::error!(
                    worker_id = self.id,
                    id = job.id,
                    "Result queue closed while workers were running"
                );
                break;
            }
        }

        reporter.report(WorkerEvent::Stopped {
            worker_id: self.id,
            jobs_processed: processed,
        });
        processed
    }
}

/// `None` only once the queue is both empty and closed.
async fn next_job(jobs: &SharedJobs) -> Option<Job> {
    jobs.lock().await.recv().await
}
