use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Hosts accepted as Twitter/X links when `TWITTER_DOMAINS` is unset.
pub const DEFAULT_TWITTER_DOMAINS: &[&str] = &[
    "twitter.com",
    "www.twitter.com",
    "mobile.twitter.com",
    "x.com",
    "www.x.com",
    "mobile.x.com",
];

/// Hosts accepted as Reddit links when `REDDIT_DOMAINS` is unset.
pub const DEFAULT_REDDIT_DOMAINS: &[&str] = &[
    "reddit.com",
    "www.reddit.com",
    "old.reddit.com",
    "new.reddit.com",
    "m.reddit.com",
    "np.reddit.com",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Web Server
    pub web_host: String,
    pub web_port: u16,

    // Extraction tools
    pub yt_dlp_path: String,
    pub gallery_dl_path: String,
    pub cookies_file_path: Option<PathBuf>,
    pub extractor_timeout: Duration,

    // Supported link hosts
    pub twitter_domains: Vec<String>,
    pub reddit_domains: Vec<String>,

    // S3 Storage (uploads disabled when no bucket is set)
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_prefix: String,
    pub s3_public_url_base: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/media-shelf.sqlite",
            )),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,

            // Extraction tools
            yt_dlp_path: env_or_default("YT_DLP_PATH", "yt-dlp"),
            gallery_dl_path: env_or_default("GALLERY_DL_PATH", "gallery-dl"),
            cookies_file_path: optional_env("COOKIES_FILE_PATH").map(PathBuf::from),
            extractor_timeout: Duration::from_secs(parse_env_u64("EXTRACTOR_TIMEOUT_SECS", 20)?),

            // Supported link hosts
            twitter_domains: parse_env_list("TWITTER_DOMAINS", DEFAULT_TWITTER_DOMAINS),
            reddit_domains: parse_env_list("REDDIT_DOMAINS", DEFAULT_REDDIT_DOMAINS),

            // S3 Storage
            s3_bucket: optional_env("S3_BUCKET"),
            s3_region: env_or_default("S3_REGION", "us-east-1"),
            s3_endpoint: optional_env("S3_ENDPOINT"),
            s3_prefix: env_or_default("S3_PREFIX", "uploads/"),
            s3_public_url_base: optional_env("S3_PUBLIC_URL_BASE"),
        })
    }

    /// Defaults for tests; never reads the environment.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            database_path: PathBuf::from(":memory:"),
            web_host: "127.0.0.1".to_string(),
            web_port: 0,
            yt_dlp_path: "yt-dlp".to_string(),
            gallery_dl_path: "gallery-dl".to_string(),
            cookies_file_path: None,
            extractor_timeout: Duration::from_secs(20),
            twitter_domains: DEFAULT_TWITTER_DOMAINS.iter().map(ToString::to_string).collect(),
            reddit_domains: DEFAULT_REDDIT_DOMAINS.iter().map(ToString::to_string).collect(),
            s3_bucket: None,
            s3_region: "us-east-1".to_string(),
            s3_endpoint: None,
            s3_prefix: "uploads/".to_string(),
            s3_public_url_base: None,
        }
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extractor_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "EXTRACTOR_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.twitter_domains.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TWITTER_DOMAINS".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.reddit_domains.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "REDDIT_DOMAINS".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if let Some(bucket) = &self.s3_bucket {
            if bucket.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: "S3_BUCKET".to_string(),
                    message: "cannot be blank".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

/// Comma separated host list, lowercased. Falls back to `default` when unset.
fn parse_env_list(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(val) if !val.trim().is_empty() => split_host_list(&val),
        _ => default.iter().map(ToString::to_string).collect(),
    }
}

fn split_host_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
