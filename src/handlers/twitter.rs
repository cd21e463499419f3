use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::normalize::{is_valid_host_name, path_segments};
use super::traits::{CanonicalUrl, HostKind, Provider, SiteHandler, UrlError};

/// Legacy image size suffix, e.g. `/media/ABC.jpg:small`.
static LEGACY_SIZE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.[A-Za-z0-9]+):[A-Za-z0-9_]+$").unwrap());

pub struct TwitterHandler;

impl TwitterHandler {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for TwitterHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteHandler for TwitterHandler {
    fn provider(&self) -> Provider {
        Provider::Twitter
    }

    fn normalize(&self, url: &Url) -> Result<CanonicalUrl, UrlError> {
        let segments = path_segments(url);
        if segments.len() < 3 || segments[1] != "status" {
            return Err(UrlError::malformed(
                Provider::Twitter,
                "URL must be in the format /<username>/status/<id>",
            ));
        }

        let username = segments[0];
        let status_id = segments[2];

        if !is_valid_host_name(username) {
            return Err(UrlError::malformed(
                Provider::Twitter,
                "Username may only contain letters, digits, '_' and '-'.",
            ));
        }

        if status_id.is_empty() || !status_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(UrlError::malformed(
                Provider::Twitter,
                "Status ID must be numeric.",
            ));
        }

        Ok(CanonicalUrl::new(
            Provider::Twitter,
            format!("https://twitter.com/{username}/status/{status_id}"),
            HostKind::User,
            username.to_string(),
        ))
    }

    fn image_urls(&self, media_url: &str) -> (String, String) {
        (original_size_url(media_url), media_url.to_string())
    }
}

/// Rewrite a twimg image URL to request the original upload size.
///
/// Handles `?format=jpg&name=small` as well as the older `.jpg:small` form.
/// URLs carrying neither get `name=orig` appended.
#[must_use]
pub fn original_size_url(media_url: &str) -> String {
    let Ok(mut parsed) = Url::parse(media_url) else {
        return media_url.to_string();
    };

    // Rewrite the raw query text so the other parameters keep their exact
    // encoding.
    if let Some(query) = parsed.query().filter(|q| q.split('&').any(is_name_pair)) {
        let rewritten = query
            .split('&')
            .map(|pair| if is_name_pair(pair) { "name=orig" } else { pair })
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&rewritten));
        return parsed.to_string();
    }

    let path = parsed.path().to_string();
    if LEGACY_SIZE_SUFFIX.is_match(&path) {
        let rewritten = LEGACY_SIZE_SUFFIX.replace(&path, "${1}:orig");
        parsed.set_path(&rewritten);
        return parsed.to_string();
    }

    parsed.query_pairs_mut().append_pair("name", "orig");
    parsed.to_string()
}

fn is_name_pair(pair: &str) -> bool {
    pair.split_once('=').map_or(pair, |(key, _)| key) == "name"
}
