//! Per-outcome CSV report, written as the aggregator records outcomes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use harvest_core::{Outcome, OutcomeStatus, ProgressEvent, ProgressReporter};
use serde::Serialize;

#[derive(Serialize)]
struct OutcomeRow<'a> {
    id: u64,
    status: OutcomeStatus,
    attempts: u32,
    bytes: Option<u64>,
    sha256: Option<&'a str>,
    detail: &'a str,
}

impl<'a> From<&'a Outcome> for OutcomeRow<'a> {
    fn from(outcome: &'a Outcome) -> Self {
        Self {
            id: outcome.id,
            status: outcome.status,
            attempts: outcome.attempts,
            bytes: outcome.artifact.as_ref().map(|a| a.bytes),
            sha256: outcome.artifact.as_ref().map(|a| a.sha256.as_str()),
            detail: &outcome.detail,
        }
    }
}

/// One CSV row per outcome, in arrival order.
///
/// Write errors do not interrupt the run; the first one is kept and returned
/// by [`finish`](Self::finish).
pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
    error: Option<csv::Error>,
}

impl CsvReport<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        Ok(Self::from_writer(file))
    }
}

impl<W: Write> CsvReport<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            error: None,
        }
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e).context("Failed to write outcome report");
        }
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush outcome report: {}", e.error()))
    }
}

impl<W: Write + Send> ProgressReporter for CsvReport<W> {
    fn report(&mut self, event: ProgressEvent<'_>) {
        if self.error.is_some() {
            return;
        }

        let result = match event {
            ProgressEvent::Recorded { outcome, .. } => {
                self.writer.serialize(OutcomeRow::from(outcome))
            }
            ProgressEvent::Finished { .. } => self.writer.flush().map_err(csv::Error::from),
            _ => Ok(()),
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "Outcome report write failed; further rows skipped");
            self.error = Some(e);
        }
    }
}
