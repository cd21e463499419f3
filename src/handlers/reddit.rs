use url::Url;

use super::normalize::{is_valid_host_name, path_segments};
use super::traits::{CanonicalUrl, HostKind, Provider, SiteHandler, UrlError};

const EXPECTED_FORMAT: &str =
    "URL must be in the format /r/<subreddit>/comments/<post_id> or /user/<username>/comments/<post_id>";

pub struct RedditHandler;

impl RedditHandler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RedditHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteHandler for RedditHandler {
    fn provider(&self) -> Provider {
        Provider::Reddit
    }

    fn normalize(&self, url: &Url) -> Result<CanonicalUrl, UrlError> {
        let segments = path_segments(url);
        if segments.len() < 4 || segments[2] != "comments" {
            return Err(UrlError::malformed(Provider::Reddit, EXPECTED_FORMAT));
        }
        let Some(host_kind) = HostKind::from_path_token(segments[0]) else {
            return Err(UrlError::malformed(Provider::Reddit, EXPECTED_FORMAT));
        };

        let host_name = segments[1];
        let post_id = segments[3];

        if !is_valid_host_name(host_name) {
            return Err(UrlError::malformed(
                Provider::Reddit,
                "Subreddit or username may only contain letters, digits, '_' and '-'.",
            ));
        }

        if post_id.is_empty() || !post_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(UrlError::malformed(
                Provider::Reddit,
                "Post ID must be alphanumeric.",
            ));
        }

        Ok(CanonicalUrl::new(
            Provider::Reddit,
            format!(
                "https://www.reddit.com/{}/{host_name}/comments/{post_id}",
                host_kind.as_str()
            ),
            host_kind,
            host_name.to_string(),
        ))
    }

    // Reddit posts often link out to redgifs/imgur pages rather than media.
    fn follows_redirectors(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> Result<CanonicalUrl, UrlError> {
        RedditHandler::new().normalize(&Url::parse(raw).unwrap())
    }

    #[test]
    fn test_normalize_subreddit_post() {
        let canonical =
            normalize("https://old.reddit.com/r/rust/comments/abc123/some_title/?utm_source=share")
                .unwrap();
        assert_eq!(
            canonical.normalized_url(),
            "https://www.reddit.com/r/rust/comments/abc123"
        );
        assert_eq!(canonical.host_kind(), HostKind::Subreddit);
        assert_eq!(canonical.host_name(), "rust");
    }

    #[test]
    fn test_normalize_user_post() {
        let canonical = normalize("https://www.reddit.com/user/someone/comments/x9y8z7/").unwrap();
        assert_eq!(
            canonical.normalized_url(),
            "https://www.reddit.com/user/someone/comments/x9y8z7"
        );
        assert_eq!(canonical.host_kind(), HostKind::User);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("https://m.reddit.com/r/pics/comments/1a2b3c/title").unwrap();
        let twice = normalize(once.normalized_url()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_wrong_literal_segment() {
        let err = normalize("https://reddit.com/r/sub/posts/abc").unwrap_err();
        assert_eq!(err.to_string(), EXPECTED_FORMAT);
    }

    #[test]
    fn test_unknown_host_kind() {
        assert!(matches!(
            normalize("https://reddit.com/u/someone/comments/abc"),
            Err(UrlError::MalformedUrl {
                provider: Provider::Reddit,
                ..
            })
        ));
    }

    #[test]
    fn test_too_few_segments() {
        assert!(normalize("https://reddit.com/r/sub").is_err());
    }

    #[test]
    fn test_non_alphanumeric_post_id() {
        let err = normalize("https://reddit.com/r/sub/comments/ab-c").unwrap_err();
        assert_eq!(err.to_string(), "Post ID must be alphanumeric.");
    }

    #[test]
    fn test_comma_in_subreddit_is_rejected() {
        let err = normalize("https://www.reddit.com/r/a,b/comments/abc123").unwrap_err();
        assert!(matches!(
            err,
            UrlError::MalformedUrl {
                provider: Provider::Reddit,
                ..
            }
        ));
        assert!(normalize("https://www.reddit.com/user/a,b/comments/abc123").is_err());
    }

    #[test]
    fn test_empty_subreddit_is_rejected() {
        assert!(normalize("https://www.reddit.com/r//comments/abc123").is_err());
    }
}
