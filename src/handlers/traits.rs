use std::fmt;

use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Sites a saved link can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Twitter,
    Reddit,
}

impl Provider {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Reddit => "reddit",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who hosts a post: a user profile or a subreddit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HostKind {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "r")]
    Subreddit,
    #[serde(rename = "unknown")]
    Unknown,
}

impl HostKind {
    /// Path token used in canonical URLs and tag names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Subreddit => "r",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn from_path_token(token: &str) -> Option<Self> {
        match token {
            "user" => Some(Self::User),
            "r" => Some(Self::Subreddit),
            _ => None,
        }
    }
}

/// A link in its provider's canonical form, plus who posted it.
///
/// Only the provider handlers build these, after validating the path, so
/// `normalized_url` always follows the provider template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalUrl {
    provider: Provider,
    normalized_url: String,
    host_kind: HostKind,
    host_name: String,
}

impl CanonicalUrl {
    pub(crate) fn new(
        provider: Provider,
        normalized_url: String,
        host_kind: HostKind,
        host_name: String,
    ) -> Self {
        Self {
            provider,
            normalized_url,
            host_kind,
            host_name,
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }

    #[must_use]
    pub fn host_kind(&self) -> HostKind {
        self.host_kind
    }

    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }
}

/// User-facing URL validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsupported domain. Only Twitter/X and Reddit are allowed.")]
    UnsupportedDomain,
    #[error("{message}")]
    MalformedUrl { provider: Provider, message: String },
}

impl UrlError {
    pub(crate) fn malformed(provider: Provider, message: &str) -> Self {
        Self::MalformedUrl {
            provider,
            message: message.to_string(),
        }
    }
}

/// Per-provider canonicalization and resolution hooks.
pub trait SiteHandler: Send + Sync {
    fn provider(&self) -> Provider;

    /// Validate the URL path and build the canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::MalformedUrl`] if the path does not follow the
    /// provider's post layout.
    fn normalize(&self, url: &Url) -> Result<CanonicalUrl, UrlError>;

    /// HD and SD URLs for an image emitted by the gallery extractor.
    fn image_urls(&self, media_url: &str) -> (String, String) {
        (media_url.to_string(), media_url.to_string())
    }

    /// Whether gallery entries pointing at redirector hosts are re-extracted.
    fn follows_redirectors(&self) -> bool {
        false
    }
}
