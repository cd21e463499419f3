mod classify;
mod normalize;
mod traits;

// Site handlers
mod reddit;
mod twitter;

pub use classify::DomainClassifier;
pub use normalize::{host_of, parse_url};
pub use reddit::RedditHandler;
pub use traits::{CanonicalUrl, HostKind, Provider, SiteHandler, UrlError};
pub use twitter::{original_size_url, TwitterHandler};

static TWITTER: TwitterHandler = TwitterHandler::new();
static REDDIT: RedditHandler = RedditHandler::new();

impl Provider {
    /// The handler implementing this provider's normalize/resolve hooks.
    #[must_use]
    pub fn handler(self) -> &'static dyn SiteHandler {
        match self {
            Self::Twitter => &TWITTER,
            Self::Reddit => &REDDIT,
        }
    }
}

/// Canonicalize a raw URL already known to belong to `provider`.
///
/// # Errors
///
/// Returns [`UrlError::InvalidUrl`] if the input does not parse and
/// [`UrlError::MalformedUrl`] if its path does not fit the provider.
pub fn normalize(raw_url: &str, provider: Provider) -> Result<CanonicalUrl, UrlError> {
    let parsed = parse_url(raw_url)?;
    provider.handler().normalize(&parsed)
}
