use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use crate::job::IdRange;

/// Terminal classification of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    NotFound,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Succeeded => "succeeded",
            OutcomeStatus::NotFound => "not_found",
            OutcomeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payload persisted to local storage by a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    pub bytes: u64,
    /// SHA-256 of the payload, 64-char hex
    pub sha256: String,
    pub content_type: Option<String>,
}

/// Result of running the retry policy over one job.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub id: u64,
    pub status: OutcomeStatus,
    pub detail: String,
    /// Number of fetch attempts made (at least 1).
    pub attempts: u32,
    /// Present only when `status` is `Succeeded`.
    pub artifact: Option<FetchedArtifact>,
}

impl Outcome {
    pub fn succeeded(id: u64, attempts: u32, artifact: FetchedArtifact) -> Self {
        Self {
            id,
            status: OutcomeStatus::Succeeded,
            detail: format!("Downloaded {} bytes", artifact.bytes),
            attempts,
            artifact: Some(artifact),
        }
    }

    pub fn not_found(id: u64, attempts: u32, error: &AppError) -> Self {
        Self {
            id,
            status: OutcomeStatus::NotFound,
            detail: error.to_string(),
            attempts,
            artifact: None,
        }
    }

    pub fn failed(id: u64, attempts: u32, error: &AppError) -> Self {
        Self {
            id,
            status: OutcomeStatus::Failed,
            detail: format!("Failed after {attempts} attempts: {error}"),
            attempts,
            artifact: None,
        }
    }
}

/// Running totals for a run. Only the aggregator mutates these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub processed: u64,
    pub succeeded: u64,
    pub not_found: u64,
    pub failed: u64,
}

impl RunCounters {
    /// Count one outcome: `processed` plus exactly one status counter.
    pub fn record(&mut self, status: OutcomeStatus) {
        self.processed += 1;
        match status {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::NotFound => self.not_found += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.succeeded + self.not_found + self.failed == self.processed
    }
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed | {} downloaded | {} not found | {} failed",
            self.processed, self.succeeded, self.not_found, self.failed
        )
    }
}

/// Final report of one engine run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub range: IdRange,
    pub workers: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counters: RunCounters,
}

impl RunSummary {
    pub fn to_json_pretty(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compute a SHA-256 hash of a byte payload, returned as 64-char hex.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
