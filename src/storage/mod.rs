//! Remote storage for uploaded files.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use s3::creds::Credentials;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use crate::config::Config;

/// Stores bytes somewhere public and says where.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Upload `data` under a name derived from `filename`, returning its
    /// public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    async fn upload(&self, data: &[u8], filename: &str, content_type: &str) -> Result<String>;
}

/// S3 (or S3-compatible) bucket.
#[derive(Clone)]
pub struct S3Storage {
    bucket: Box<Bucket>,
    prefix: String,
    public_url_base: String,
}

impl S3Storage {
    /// Create a client from configuration. Returns `Ok(None)` when no bucket
    /// is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing or the bucket handle
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        let Some(bucket_name) = config.s3_bucket.as_deref() else {
            return Ok(None);
        };

        let access_key = std::env::var("AWS_ACCESS_KEY_ID").context("AWS_ACCESS_KEY_ID not set")?;
        let secret_key =
            std::env::var("AWS_SECRET_ACCESS_KEY").context("AWS_SECRET_ACCESS_KEY not set")?;

        let credentials = Credentials::new(Some(&access_key), Some(&secret_key), None, None, None)
            .context("Failed to create S3 credentials")?;

        let region = if let Some(ref endpoint) = config.s3_endpoint {
            Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            }
        } else {
            config.s3_region.parse().unwrap_or(Region::UsEast1)
        };

        let bucket =
            Bucket::new(bucket_name, region, credentials).context("Failed to create S3 bucket")?;

        // Use path-style for custom endpoints (MinIO, R2, etc.)
        let bucket = if config.s3_endpoint.is_some() {
            bucket.with_path_style()
        } else {
            bucket
        };

        let public_url_base = config
            .s3_public_url_base
            .clone()
            .unwrap_or_else(|| format!("https://{bucket_name}.s3.amazonaws.com"));

        Ok(Some(Self {
            bucket,
            prefix: config.s3_prefix.clone(),
            public_url_base: public_url_base.trim_end_matches('/').to_string(),
        }))
    }

    fn object_key(&self, filename: &str) -> String {
        let date = chrono::Utc::now().format("%Y/%m/%d");
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!(
            "{}{date}/{suffix}_{}",
            self.prefix,
            sanitize_filename(filename)
        )
    }
}

#[async_trait]
impl RemoteStorage for S3Storage {
    async fn upload(&self, data: &[u8], filename: &str, content_type: &str) -> Result<String> {
        let key = self.object_key(filename);
        debug!(key = %key, content_type = %content_type, bytes = data.len(), "Uploading file to S3");

        self.bucket
            .put_object_with_content_type(&key, data, content_type)
            .await
            .context("Failed to upload file to S3")?;

        Ok(format!("{}/{key}", self.public_url_base))
    }
}

/// Content type for an upload, guessed from its name when the client sent
/// none.
#[must_use]
pub fn content_type_for(filename: &str, declared: Option<&str>) -> String {
    declared
        .filter(|ct| !ct.is_empty())
        .map_or_else(
            || {
                mime_guess::from_path(filename)
                    .first_or_octet_stream()
                    .to_string()
            },
            ToString::to_string,
        )
}

/// Make a filename safe for object keys and URLs.
///
/// Spaces and URL-significant characters become underscores, runs of
/// underscores collapse and the extension is kept.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    const MAX_NAME_LENGTH: usize = 200;

    let (name, ext) = filename
        .rfind('.')
        .map_or((filename, ""), |dot_pos| filename.split_at(dot_pos));

    let sanitized_name: String = name
        .chars()
        .map(|c| match c {
            '(' | ')' | '[' | ']' | '-' | '_' | '.' => c,
            c if c.is_alphanumeric() => c,
            _ => '_',
        })
        .collect();

    let sanitized_name = sanitized_name
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let truncated_name: String = sanitized_name.chars().take(MAX_NAME_LENGTH).collect();
    let ext: String = ext
        .chars()
        .filter(|c| *c == '.' || c.is_ascii_alphanumeric())
        .collect();

    if truncated_name.is_empty() {
        format!("file{ext}")
    } else {
        format!("{truncated_name}{ext}")
    }
}
