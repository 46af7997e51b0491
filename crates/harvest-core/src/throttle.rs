//! Fixed inter-request delay per host.
//!
//! Wraps any [`Fetcher`] so that consecutive requests to the same host
//! (scheme + host + port) start at least `delay` apart, no matter how many
//! workers share the wrapper. Each caller reserves the next free slot for its
//! host under a short lock and then sleeps outside of it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use harvest_core::throttle::{ThrottleConfig, ThrottledFetcher};
//! use harvest_core::testutil::MockFetcher;
//!
//! let fetcher = ThrottledFetcher::new(
//!     MockFetcher::new(),
//!     ThrottleConfig::new(Duration::from_millis(250)),
//! );
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use url::Url;

use crate::error::AppError;
use crate::models::FetchedArtifact;
use crate::traits::Fetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Minimum spacing between request starts to the same host.
    pub delay: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

/// A [`Fetcher`] wrapper that spaces requests to the same host.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    /// Earliest start time of the next request, per host key.
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// `scheme://host:port`, or `None` if the target is not a URL with a host.
    fn host_key(target: &str) -> Option<String> {
        let url = Url::parse(target).ok()?;
        let host = url.host_str()?;
        let port = url
            .port_or_known_default()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Some(format!("{}://{}{}", url.scheme(), host, port))
    }

    /// Claim the next slot for `key` and return how long to wait for it.
    fn reserve(&self, key: &str) -> Duration {
        let now = Instant::now();
        let mut slots = self
            .next_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let slot = match slots.get(key) {
            Some(&next) if next > now => next,
            _ => now,
        };
        slots.insert(key.to_string(), slot + self.config.delay);
        slot.saturating_duration_since(now)
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, target: &str, destination: &Path) -> Result<FetchedArtifact, AppError> {
        if let Some(key) = Self::host_key(target) {
            let wait = self.reserve(&key);
            if !wait.is_zero() {
                tracing::trace!(host = %key, wait_ms = %wait.as_millis(), "Throttling request");
                tokio::time::sleep(wait).await;
            }
        }
        self.inner.fetch(target, destination).await
    }
}
