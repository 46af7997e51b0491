use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::job::{IdRange, Job, TargetTemplate};

/// Enumerates every identifier of a range, in ascending order, as jobs.
#[derive(Debug, Clone)]
pub struct JobSource {
    range: IdRange,
    target: TargetTemplate,
}

impl JobSource {
    pub fn new(range: IdRange, target: TargetTemplate) -> Self {
        Self { range, target }
    }

    pub fn jobs(&self) -> impl Iterator<Item = Job> + '_ {
        self.range
            .iter()
            .map(move |id| Job::new(id, self.target.render(id)))
    }

    /// Push every job into `queue`, then close it by dropping the sender.
    ///
    /// Suspends whenever the bounded queue is full. Returns the number of
    /// jobs handed over; stops early only if every receiver is gone.
    pub async fn run(self, queue: mpsc::Sender<Job>) -> u64 {
        let mut emitted = 0u64;
        for job in self.jobs() {
            let id = job.id;
            if queue.send(job).await.is_err() {
                tracing::error!(id, emitted, "Job queue closed before range was exhausted");
                break;
            }
            emitted += 1;
        }
        tracing::debug!(emitted, "Job source exhausted");
        emitted
    }

    pub fn spawn(self, queue: mpsc::Sender<Job>) -> JoinHandle<u64> {
        tokio::spawn(self.run(queue))
    }
}
