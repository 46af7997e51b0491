pub mod aggregator;
pub mod content;
pub mod engine;
pub mod error;
pub mod job;
pub mod models;
pub mod retry;
pub mod source;
pub mod testutil;
pub mod throttle;
pub mod traits;
pub mod worker;

pub use aggregator::{Aggregator, ProgressEvent, ProgressReporter, TracingProgressReporter};
pub use content::{ContentPolicy, ContentVerdict};
pub use engine::Engine;
pub use error::AppError;
pub use job::{ArtifactNaming, EngineConfig, IdRange, Job, TargetTemplate};
pub use models::{FetchedArtifact, Outcome, OutcomeStatus, RunCounters, RunSummary, compute_hash};
pub use retry::RetryPolicy;
pub use traits::Fetcher;
pub use worker::{TracingWorkerReporter, WorkerEvent, WorkerReporter};
