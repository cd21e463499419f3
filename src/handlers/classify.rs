use std::collections::HashSet;

use crate::config::Config;

use super::normalize::{host_of, parse_url};
use super::traits::{CanonicalUrl, Provider, UrlError};

/// Maps link hosts to providers using fixed allow-lists.
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    twitter: HashSet<String>,
    reddit: HashSet<String>,
}

impl DomainClassifier {
    #[must_use]
    pub fn new<T, R>(twitter: T, reddit: R) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self {
            twitter: twitter
                .into_iter()
                .map(|d| d.as_ref().to_lowercase())
                .collect(),
            reddit: reddit
                .into_iter()
                .map(|d| d.as_ref().to_lowercase())
                .collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.twitter_domains, &config.reddit_domains)
    }

    /// Identify which provider a raw URL belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`UrlError::InvalidUrl`] if the input does not parse and
    /// [`UrlError::UnsupportedDomain`] if the host is not on any allow-list.
    pub fn classify(&self, raw_url: &str) -> Result<Provider, UrlError> {
        let parsed = parse_url(raw_url)?;
        self.provider_for_host(&host_of(&parsed))
    }

    /// Classify and normalize in one step.
    ///
    /// # Errors
    ///
    /// Returns the classification error or the provider's
    /// [`UrlError::MalformedUrl`].
    pub fn canonicalize(&self, raw_url: &str) -> Result<CanonicalUrl, UrlError> {
        let provider = self.classify(raw_url)?;
        super::normalize(raw_url, provider)
    }

    fn provider_for_host(&self, host: &str) -> Result<Provider, UrlError> {
        if self.twitter.contains(host) {
            Ok(Provider::Twitter)
        } else if self.reddit.contains(host) {
            Ok(Provider::Reddit)
        } else {
            Err(UrlError::UnsupportedDomain)
        }
    }
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_TWITTER_DOMAINS,
            crate::config::DEFAULT_REDDIT_DOMAINS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HostKind;

    #[test]
    fn test_classify_known_hosts() {
        let classifier = DomainClassifier::default();
        assert_eq!(
            classifier.classify("https://x.com/a/status/1").unwrap(),
            Provider::Twitter
        );
        assert_eq!(
            classifier.classify("https://MOBILE.twitter.com/a/status/1").unwrap(),
            Provider::Twitter
        );
        assert_eq!(
            classifier.classify("https://old.reddit.com/r/a/comments/b").unwrap(),
            Provider::Reddit
        );
    }

    #[test]
    fn test_classify_unsupported() {
        let classifier = DomainClassifier::default();
        assert_eq!(
            classifier.classify("https://youtube.com/watch?v=abc"),
            Err(UrlError::UnsupportedDomain)
        );
        // Suffix matches are not enough.
        assert_eq!(
            classifier.classify("https://notreddit.com/r/a/comments/b"),
            Err(UrlError::UnsupportedDomain)
        );
    }

    #[test]
    fn test_custom_lists() {
        let classifier = DomainClassifier::new(["nitter.example"], ["REDDIT.example"]);
        assert_eq!(
            classifier.classify("https://nitter.example/a/status/1").unwrap(),
            Provider::Twitter
        );
        assert_eq!(
            classifier.classify("https://reddit.example/r/a/comments/b").unwrap(),
            Provider::Reddit
        );
        assert!(classifier.classify("https://x.com/a/status/1").is_err());
    }

    #[test]
    fn test_canonicalize_end_to_end() {
        let canonical = DomainClassifier::default()
            .canonicalize("https://x.com/alice/status/12345?foo=bar")
            .unwrap();
        assert_eq!(
            canonical.normalized_url(),
            "https://twitter.com/alice/status/12345"
        );
        assert_eq!(canonical.host_kind(), HostKind::User);
        assert_eq!(canonical.host_name(), "alice");
    }

    #[test]
    fn test_canonicalize_twitter_aliases_agree() {
        let classifier = DomainClassifier::default();
        let a = classifier
            .canonicalize("https://twitter.com/bob/status/42")
            .unwrap();
        let b = classifier
            .canonicalize("https://www.x.com/bob/status/42/analytics?s=20")
            .unwrap();
        assert_eq!(a, b);
    }
}
