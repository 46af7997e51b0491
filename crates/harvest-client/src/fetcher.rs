use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use harvest_core::content::{ContentPolicy, ContentVerdict};
use harvest_core::error::AppError;
use harvest_core::models::FetchedArtifact;
use harvest_core::traits::Fetcher;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

/// HTTP fetcher using reqwest.
///
/// Streams each response body straight to its destination file. A 404 maps
/// to [`AppError::NotFound`]; every other failure leaves no file behind.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
    content_policy: Arc<ContentPolicy>,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("Harvest/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            content_policy: Arc::new(ContentPolicy::default()),
        })
    }

    pub fn with_content_policy(mut self, policy: ContentPolicy) -> Self {
        self.content_policy = Arc::new(policy);
        self
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout)
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(e.to_string())
        }
    }

    /// Copy the body to `destination`, hashing as it goes.
    async fn write_body(
        &self,
        response: &mut Response,
        destination: &Path,
    ) -> Result<(u64, String), AppError> {
        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            AppError::StorageError(format!("Failed to create {}: {e}", destination.display()))
        })?;
        let mut hasher = Sha256::new();
        let mut written = 0u64;

        while let Some(chunk) = response.chunk().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout)
            } else {
                AppError::NetworkError(format!("Failed to read response body: {e}"))
            }
        })? {
            file.write_all(&chunk).await.map_err(|e| {
                AppError::StorageError(format!("Failed to save {}: {e}", destination.display()))
            })?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(AppError::EmptyPayload);
        }
        Ok((written, format!("{:x}", hasher.finalize())))
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, target: &str, destination: &Path) -> Result<FetchedArtifact, AppError> {
        let mut response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("HTTP 404 for {target}")));
        }
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                target
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            // Lossy: obs-text in a parameter must not hide the media type
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        match self.content_policy.classify(content_type.as_deref()) {
            ContentVerdict::Accepted => {}
            ContentVerdict::AcceptedWithWarning(media) => {
                tracing::warn!(%target, content_type = %media, "Unexpected content type, saving anyway");
            }
            ContentVerdict::Rejected(reason) => {
                return Err(AppError::ContentRejected(format!("{reason} for {target}")));
            }
        }

        match self.write_body(&mut response, destination).await {
            Ok((bytes, sha256)) => Ok(FetchedArtifact {
                path: destination.to_path_buf(),
                bytes,
                sha256,
                content_type,
            }),
            Err(e) => {
                remove_partial(destination).await;
                Err(e)
            }
        }
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::error!(path = %path.display(), error = %e, "Failed to remove partial download");
    }
}
