use std::future::Future;
use std::path::Path;

use crate::error::AppError;
use crate::models::FetchedArtifact;

/// Retrieves one remote resource and persists it to a local destination.
///
/// Implementations classify the result:
/// - `Ok` only when a non-empty, acceptable payload was written to `destination`;
/// - `Err(AppError::NotFound)` when the remote reports the resource as absent;
/// - any other `Err` for transient failures.
///
/// On every `Err` path no file (empty or partial) may remain at `destination`.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(
        &self,
        target: &str,
        destination: &Path,
    ) -> impl Future<Output = Result<FetchedArtifact, AppError>> + Send;
}
