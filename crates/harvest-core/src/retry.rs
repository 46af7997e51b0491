use std::path::Path;
use std::time::Duration;

use crate::error::AppError;
use crate::job::Job;
use crate::models::Outcome;
use crate::traits::Fetcher;

/// Bounded-attempt retry with a fixed delay between attempts.
///
/// Not-found short-circuits without retrying. Every other fetch error is
/// retried until `max_attempts` is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run the fetcher for one job until it reaches a terminal outcome.
    ///
    /// Never returns an error: every failure is folded into the outcome.
    pub async fn execute<F: Fetcher>(&self, fetcher: &F, job: &Job, destination: &Path) -> Outcome {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match fetcher.fetch(&job.target, destination).await {
                Ok(artifact) => return Outcome::succeeded(job.id, attempt, artifact),
                Err(e) if e.is_not_found() => {
                    discard_artifact(destination).await;
                    return Outcome::not_found(job.id, attempt, &e);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    tracing::debug!(
                        id = job.id,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Fetch failed, will retry"
                    );
                    tokio::time::sleep(self.delay).await;
                }
                Err(e) => {
                    discard_artifact(destination).await;
                    return Outcome::failed(job.id, attempt, &e);
                }
            }
        }
    }
}

/// Remove whatever a failed fetch may have left at `path`.
async fn discard_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::warn!(path = %path.display(), "Removed leftover artifact after failed fetch");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to remove leftover artifact");
        }
    }
}
