use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;
use crate::retry::RetryPolicy;

const ID_PLACEHOLDER: &str = "{id}";

/// One unit of work: an identifier and the address derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: u64,
    pub target: String,
}

impl Job {
    pub fn new(id: u64, target: impl Into<String>) -> Self {
        Self {
            id,
            target: target.into(),
        }
    }
}

/// Closed identifier range `[start, end]`. Empty when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: u64,
    pub end: u64,
}

impl IdRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Identifiers in ascending order.
    pub fn iter(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }
}

/// URL template with an `{id}` placeholder, e.g.
/// `https://example.org/policies/{id}.pdf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTemplate {
    template: String,
}

impl TargetTemplate {
    /// Validate and wrap a template.
    ///
    /// The template must contain `{id}` and render to a parseable URL.
    pub fn new(template: impl Into<String>) -> Result<Self, AppError> {
        let template = template.into();
        if !template.contains(ID_PLACEHOLDER) {
            return Err(AppError::ConfigError(format!(
                "URL template '{template}' has no {ID_PLACEHOLDER} placeholder"
            )));
        }

        let this = Self { template };
        let sample = this.render(0);
        Url::parse(&sample).map_err(|e| {
            AppError::ConfigError(format!("URL template renders invalid URL '{sample}': {e}"))
        })?;

        Ok(this)
    }

    pub fn render(&self, id: u64) -> String {
        self.template.replace(ID_PLACEHOLDER, &id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// Deterministic artifact naming: `<dir>/<prefix>_<id>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    pub prefix: String,
    pub extension: String,
}

impl ArtifactNaming {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn file_name(&self, id: u64) -> String {
        if self.extension.is_empty() {
            format!("{}_{}", self.prefix, id)
        } else {
            format!("{}_{}.{}", self.prefix, id, self.extension)
        }
    }

    pub fn path_for(&self, dir: &Path, id: u64) -> PathBuf {
        dir.join(self.file_name(id))
    }
}

impl Default for ArtifactNaming {
    fn default() -> Self {
        Self::new("doc", "pdf")
    }
}

/// Configuration for one engine run.
///
/// Pool size, queue capacity and retry policy are fixed for the lifetime of
/// the run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub range: IdRange,
    pub target: TargetTemplate,
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
    pub output_dir: PathBuf,
    pub naming: ArtifactNaming,
    /// Emit a progress snapshot every this many processed outcomes.
    pub progress_interval: u64,
}

impl EngineConfig {
    /// Defaults: ids 0..=10000, 10 workers, queue capacity 100, 3 attempts
    /// 2s apart, output to `./downloads`, progress every 100.
    pub fn new(target: TargetTemplate) -> Self {
        Self {
            range: IdRange::new(0, 10_000),
            target,
            workers: 10,
            queue_capacity: 100,
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from("./downloads"),
            naming: ArtifactNaming::default(),
            progress_interval: 100,
        }
    }

    pub fn with_range(mut self, range: IdRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_naming(mut self, naming: ArtifactNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.workers == 0 {
            return Err(AppError::ConfigError("worker count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(AppError::ConfigError("queue capacity must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::ConfigError("max attempts must be at least 1".into()));
        }
        if self.progress_interval == 0 {
            return Err(AppError::ConfigError(
                "progress interval must be at least 1".into(),
            ));
        }
        if self.naming.prefix.is_empty() {
            return Err(AppError::ConfigError("artifact prefix must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> TargetTemplate {
        TargetTemplate::new("https://example.com/docs/{id}.pdf").unwrap()
    }

    #[test]
    fn test_range_len() {
        assert_eq!(IdRange::new(0, 10_000).len(), 10_001);
        assert_eq!(IdRange::new(5, 5).len(), 1);
        assert_eq!(IdRange::new(6, 5).len(), 0);
        assert!(IdRange::new(6, 5).is_empty());
        assert_eq!(IdRange::new(6, 5).iter().count(), 0);
        assert_eq!(IdRange::new(0, u64::MAX).len(), u64::MAX);
    }

    #[test]
    fn test_template_renders_id() {
        assert_eq!(template().render(42), "https://example.com/docs/42.pdf");
    }

    #[test]
    fn test_template_requires_placeholder() {
        let err = TargetTemplate::new("https://example.com/docs/1.pdf").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_template_rejects_invalid_url() {
        let err = TargetTemplate::new("not a url/{id}").unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_artifact_naming() {
        let naming = ArtifactNaming::new("policy", ".pdf");
        assert_eq!(naming.file_name(17), "policy_17.pdf");
        assert_eq!(
            naming.path_for(Path::new("/tmp/out"), 17),
            PathBuf::from("/tmp/out/policy_17.pdf")
        );
        assert_eq!(ArtifactNaming::new("raw", "").file_name(3), "raw_3");
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::new(template());
        assert_eq!(config.range, IdRange::new(0, 10_000));
        assert_eq!(config.workers, 10);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.progress_interval, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::new(template()).with_workers(0).validate().is_err());
        assert!(
            EngineConfig::new(template())
                .with_queue_capacity(0)
                .validate()
                .is_err()
        );
        assert!(
            EngineConfig::new(template())
                .with_retry(RetryPolicy::default().with_max_attempts(0))
                .validate()
                .is_err()
        );
        assert!(
            EngineConfig::new(template())
                .with_progress_interval(0)
                .validate()
                .is_err()
        );
    }
}
