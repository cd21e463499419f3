use url::Url;

use super::traits::UrlError;

/// Parse user input into an absolute http(s) URL.
///
/// # Errors
///
/// Returns [`UrlError::InvalidUrl`] for anything that is not an absolute
/// http(s) URL with a host.
pub fn parse_url(raw_url: &str) -> Result<Url, UrlError> {
    let trimmed = raw_url.trim();
    let parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(UrlError::InvalidUrl("missing host".to_string()));
    }

    Ok(parsed)
}

/// Lowercased host of a parsed URL.
#[must_use]
pub fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_lowercase()
}

/// Path split on `/` after stripping leading and trailing slashes.
///
/// Empty segments in the middle are kept so `/a//b` does not collapse into
/// `/a/b`.
#[must_use]
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path().trim_matches('/').split('/').collect()
}

/// Whether a username or subreddit path segment is safe to store and tag.
///
/// Accepts ASCII letters, digits, `_` and `-`. Anything else (including the
/// comma, which tag names cannot hold) is rejected.
#[must_use]
pub fn is_valid_host_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_trims_whitespace() {
        let url = parse_url("  https://x.com/alice/status/1\n").unwrap();
        assert_eq!(url.host_str(), Some("x.com"));
    }

    #[test]
    fn test_parse_url_rejects_relative() {
        assert!(matches!(
            parse_url("x.com/alice/status/1"),
            Err(UrlError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_url_rejects_non_http() {
        assert!(matches!(
            parse_url("mailto:test@example.com"),
            Err(UrlError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_host_is_lowercased() {
        let url = parse_url("https://WWW.Reddit.COM/r/rust").unwrap();
        assert_eq!(host_of(&url), "www.reddit.com");
    }

    #[test]
    fn test_path_segments() {
        let url = parse_url("https://example.com/a/b/c/?q=1#frag").unwrap();
        assert_eq!(path_segments(&url), vec!["a", "b", "c"]);

        let url = parse_url("https://example.com/a//b").unwrap();
        assert_eq!(path_segments(&url), vec!["a", "", "b"]);
    }

    #[test]
    fn test_host_name_charset() {
        assert!(is_valid_host_name("alice_99"));
        assert!(is_valid_host_name("some-user"));
        assert!(!is_valid_host_name(""));
        assert!(!is_valid_host_name("a,b"));
        assert!(!is_valid_host_name("a%2Cb"));
        assert!(!is_valid_host_name("a.b"));
    }
}
