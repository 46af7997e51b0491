//! Content-type classification for fetched payloads.
//!
//! Servers are inconsistent about labelling documents, so the policy is
//! permissive: an explicit allow-list is accepted silently, an explicit
//! reject-list (error pages) and a missing header are refused, and anything
//! else is accepted with a warning.

/// Decision for one response's content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentVerdict {
    Accepted,
    /// Not on the allow-list, but not known to be an error page either.
    AcceptedWithWarning(String),
    Rejected(String),
}

impl ContentVerdict {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, ContentVerdict::Rejected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPolicy {
    accepted: Vec<String>,
    rejected: Vec<String>,
}

impl ContentPolicy {
    pub fn new<A, R>(accepted: A, rejected: R) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self {
            accepted: accepted.into_iter().map(|s| media_type(s.as_ref())).collect(),
            rejected: rejected.into_iter().map(|s| media_type(s.as_ref())).collect(),
        }
    }

    /// Classify a `Content-Type` header value (`None` when absent).
    pub fn classify(&self, content_type: Option<&str>) -> ContentVerdict {
        let Some(raw) = content_type.filter(|s| !s.trim().is_empty()) else {
            return ContentVerdict::Rejected("missing content type".to_string());
        };

        let media = media_type(raw);
        if self.accepted.iter().any(|a| *a == media) {
            ContentVerdict::Accepted
        } else if self.rejected.iter().any(|r| *r == media) {
            ContentVerdict::Rejected(media)
        } else {
            ContentVerdict::AcceptedWithWarning(media)
        }
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new(["application/pdf", "application/octet-stream"], ["text/html"])
    }
}

/// Lowercased media type with parameters stripped.
fn media_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
