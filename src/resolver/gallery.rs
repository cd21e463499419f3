use url::Url;

use super::MediaType;
use crate::extractor::GalleryEntry;
use crate::handlers::{host_of, SiteHandler};

/// Hosts serving media files directly. Gallery entries elsewhere are noise.
pub const MEDIA_CDN_HOSTS: &[&str] = &[
    "pbs.twimg.com",
    "i.redd.it",
    "preview.redd.it",
    "i.imgur.com",
    "media.redgifs.com",
];

/// Pages that only point at media hosted elsewhere.
pub const REDIRECTOR_HOSTS: &[&str] = &[
    "redgifs.com",
    "www.redgifs.com",
    "v3.redgifs.com",
    "imgur.com",
    "www.imgur.com",
    "m.imgur.com",
];

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".mov", ".m4v"];

/// What to do with one gallery-dl entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryItem {
    Media {
        hd_url: String,
        sd_url: String,
        media_type: MediaType,
    },
    /// Re-run extraction on this page.
    Redirect(String),
    Discard,
}

/// Classify a gallery entry for the given provider.
#[must_use]
pub fn classify_entry(entry: &GalleryEntry, handler: &dyn SiteHandler) -> GalleryItem {
    // gallery-dl hands some videos to yt-dlp and marks them with this prefix.
    let raw = entry.url.strip_prefix("ytdl:").unwrap_or(&entry.url);
    let Ok(parsed) = Url::parse(raw) else {
        return GalleryItem::Discard;
    };
    let host = host_of(&parsed);

    if MEDIA_CDN_HOSTS.contains(&host.as_str()) {
        let media_type = media_type_for(&parsed);
        let (hd_url, sd_url) = quality_urls(&entry.metadata)
            .unwrap_or_else(|| handler.image_urls(raw));
        return GalleryItem::Media {
            hd_url,
            sd_url,
            media_type,
        };
    }

    if handler.follows_redirectors() && REDIRECTOR_HOSTS.contains(&host.as_str()) {
        return GalleryItem::Redirect(raw.to_string());
    }

    GalleryItem::Discard
}

fn media_type_for(url: &Url) -> MediaType {
    let path = url.path().to_lowercase();
    if VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        MediaType::Video
    } else {
        MediaType::Image
    }
}

/// Explicit `urls: {hd, sd}` pair in the entry metadata (redgifs style).
fn quality_urls(metadata: &serde_json::Value) -> Option<(String, String)> {
    let urls = metadata.get("urls")?;
    let hd = urls.get("hd")?.as_str()?;
    let sd = urls.get("sd").and_then(|v| v.as_str()).unwrap_or(hd);
    Some((hd.to_string(), sd.to_string()))
}
