//! Turn a canonical post URL into playable media variants.

mod gallery;
mod select;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::extractor::{self, GalleryExtractor, StructuredEntry, StructuredExtractor};
use crate::handlers::{CanonicalUrl, SiteHandler};

pub use gallery::{classify_entry, GalleryItem, MEDIA_CDN_HOSTS, REDIRECTOR_HOSTS};
pub use select::{select_video_urls, SD_MAX_SHORT_SIDE};

/// How many redirector hops are followed from a post.
pub const MAX_REDIRECT_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
}

impl MediaType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playable asset. `order` 0 is the primary variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaVariant {
    pub hd_url: String,
    pub sd_url: String,
    pub media_type: MediaType,
    pub order: u32,
}

/// Everything found for one URL. No variants means no media, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub original_url: String,
    pub variants: Vec<MediaVariant>,
}

impl ResolutionResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// A variant before its position is known.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    hd_url: String,
    sd_url: String,
    media_type: MediaType,
}

/// Runs the extraction strategies for a canonical URL.
#[derive(Clone)]
pub struct MediaResolver {
    structured: Arc<dyn StructuredExtractor>,
    gallery: Arc<dyn GalleryExtractor>,
    structured_budget: Duration,
}

impl MediaResolver {
    #[must_use]
    pub fn new(
        structured: Arc<dyn StructuredExtractor>,
        gallery: Arc<dyn GalleryExtractor>,
        structured_budget: Duration,
    ) -> Self {
        Self {
            structured,
            gallery,
            structured_budget,
        }
    }

    /// yt-dlp and gallery-dl subprocesses configured from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let (ytdlp, gallerydl) = extractor::from_config(config);
        Self::new(
            Arc::new(ytdlp),
            Arc::new(gallerydl),
            config.extractor_timeout,
        )
    }

    /// Resolve a canonical URL into ordered media variants.
    ///
    /// Extractor failures only reduce what is found; this never fails.
    pub async fn resolve(&self, canonical: &CanonicalUrl) -> ResolutionResult {
        let url = canonical.normalized_url();
        let handler = canonical.provider().handler();

        let videos: Vec<Candidate> = self
            .run_structured(url)
            .await
            .iter()
            .filter_map(select_video_urls)
            .map(|(hd_url, sd_url)| Candidate {
                hd_url,
                sd_url,
                media_type: MediaType::Video,
            })
            .collect();
        debug!(url = %url, count = videos.len(), "Structured extractor videos");

        let mut images = Vec::new();
        self.collect_gallery(url.to_string(), handler, 0, &mut images)
            .await;
        debug!(url = %url, count = images.len(), "Gallery extractor media");

        let variants = assemble(videos.into_iter().chain(images));
        info!(url = %url, variants = variants.len(), "Resolved media");

        ResolutionResult {
            original_url: url.to_string(),
            variants,
        }
    }

    /// Run the structured extractor in its own task, bounded by the budget.
    ///
    /// On timeout the task is told to stop and detached; whatever it
    /// produces afterwards is dropped with the join handle.
    async fn run_structured(&self, url: &str) -> Vec<StructuredEntry> {
        let extractor = Arc::clone(&self.structured);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_url = url.to_string();
        // Cancels the extractor on every exit, including when the caller
        // drops this future before the budget runs out.
        let _cancel_on_drop = cancel.drop_guard();

        let handle =
            tokio::spawn(async move { extractor.extract(&task_url, task_cancel).await });

        match tokio::time::timeout(self.structured_budget, handle).await {
            Ok(Ok(Ok(entries))) => entries,
            Ok(Ok(Err(e))) => {
                warn!(url = %url, error = %e, "Structured extractor failed");
                Vec::new()
            }
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "Structured extractor task failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    url = %url,
                    budget_secs = self.structured_budget.as_secs_f64(),
                    "Structured extractor exceeded time budget, skipping"
                );
                Vec::new()
            }
        }
    }

    fn collect_gallery<'a>(
        &'a self,
        url: String,
        handler: &'static dyn SiteHandler,
        depth: usize,
        out: &'a mut Vec<Candidate>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let entries = match self.gallery.extract(&url).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(url = %url, error = %e, "Gallery extractor failed");
                    return;
                }
            };

            for entry in &entries {
                match classify_entry(entry, handler) {
                    GalleryItem::Media {
                        hd_url,
                        sd_url,
                        media_type,
                    } => out.push(Candidate {
                        hd_url,
                        sd_url,
                        media_type,
                    }),
                    GalleryItem::Redirect(next) if depth < MAX_REDIRECT_DEPTH => {
                        debug!(from = %url, to = %next, "Following redirector");
                        self.collect_gallery(next, handler, depth + 1, out).await;
                    }
                    GalleryItem::Redirect(next) => {
                        debug!(url = %next, "Redirect depth exceeded, dropping entry");
                    }
                    GalleryItem::Discard => {}
                }
            }
        })
    }
}

/// Number candidates by position, keeping the first of any repeated HD URL.
fn assemble(candidates: impl IntoIterator<Item = Candidate>) -> Vec<MediaVariant> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.hd_url.clone()))
        .enumerate()
        .map(|(order, c)| MediaVariant {
            hd_url: c.hd_url,
            sd_url: c.sd_url,
            media_type: c.media_type,
            order: order as u32,
        })
        .collect()
}
