//! External media extraction tools.
//!
//! Both tools run as subprocesses. The resolver talks to them through the
//! [`StructuredExtractor`] and [`GalleryExtractor`] traits so tests can swap in
//! in-process fakes.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;

pub mod gallerydl;
pub mod ytdlp;

pub use gallerydl::GalleryDl;
pub use ytdlp::YtDlp;

/// One encoding of a video as reported by the structured extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaFormat {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
}

/// One media entry (a tweet can carry several) from the structured extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StructuredEntry {
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub formats: Vec<MediaFormat>,
}

/// A media URL emitted by the gallery extractor with its metadata object.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub url: String,
    pub metadata: serde_json::Value,
}

/// Metadata extractor returning per-entry format lists (yt-dlp style).
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Extract entries for `url`.
    ///
    /// Implementations should stop work and return promptly once `cancel`
    /// fires; the caller has already given up on the result by then.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is missing, fails or emits garbage.
    async fn extract(&self, url: &str, cancel: CancellationToken) -> Result<Vec<StructuredEntry>>;
}

/// Scraper returning a flat list of media URLs (gallery-dl style).
#[async_trait]
pub trait GalleryExtractor: Send + Sync {
    /// Extract media URLs for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is missing, fails or emits garbage.
    async fn extract(&self, url: &str) -> Result<Vec<GalleryEntry>>;
}

/// Options shared by both subprocess extractors.
#[derive(Debug, Clone)]
pub struct ToolOptions {
    pub program: String,
    pub cookies_file: Option<PathBuf>,
}

impl ToolOptions {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cookies_file: None,
        }
    }

    #[must_use]
    pub fn with_cookies(mut self, cookies_file: Option<PathBuf>) -> Self {
        self.cookies_file = cookies_file;
        self
    }

    /// `--cookies FILE` when a usable cookies file is configured.
    fn cookie_args(&self) -> Vec<String> {
        let Some(path) = self.cookies_file.as_deref() else {
            return Vec::new();
        };
        if usable_cookies_file(path) {
            vec!["--cookies".to_string(), path.to_string_lossy().to_string()]
        } else {
            Vec::new()
        }
    }
}

fn usable_cookies_file(path: &Path) -> bool {
    if !path.exists() {
        warn!(path = %path.display(), "Cookies file specified but does not exist, continuing without cookies");
        false
    } else if path.is_dir() {
        warn!(path = %path.display(), "Cookies path is a directory, continuing without cookies");
        false
    } else {
        debug!(path = %path.display(), "Using cookies file");
        true
    }
}

/// Build both subprocess extractors from configuration.
#[must_use]
pub fn from_config(config: &Config) -> (YtDlp, GalleryDl) {
    let cookies = config.cookies_file_path.clone();
    (
        YtDlp::new(ToolOptions::new(&config.yt_dlp_path).with_cookies(cookies.clone())),
        GalleryDl::new(ToolOptions::new(&config.gallery_dl_path).with_cookies(cookies)),
    )
}
