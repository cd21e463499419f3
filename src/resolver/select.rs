use std::cmp::Reverse;

use crate::extractor::StructuredEntry;

/// Largest short side (in pixels) accepted for the SD encoding.
pub const SD_MAX_SHORT_SIDE: u32 = 600;

/// Pick the HD and SD encodings of a video entry.
///
/// Encodings are ranked by `min(width, height)` descending; ties keep the
/// later encoding first since yt-dlp lists formats worst to best. HD is the
/// top encoding. SD is the best encoding whose short side is at most
/// [`SD_MAX_SHORT_SIDE`], or the lowest-ranked one when none qualifies.
///
/// Returns `None` for audio-only entries and entries without any usable
/// encoding.
#[must_use]
pub fn select_video_urls(entry: &StructuredEntry) -> Option<(String, String)> {
    if entry.vcodec.as_deref() == Some("none") {
        return None;
    }

    let mut ranked: Vec<(u32, usize, &str)> = entry
        .formats
        .iter()
        .enumerate()
        .filter(|(_, f)| f.vcodec.as_deref() != Some("none"))
        .filter_map(|(i, f)| {
            let short_side = f.width?.min(f.height?);
            Some((short_side, i, f.url.as_deref()?))
        })
        .collect();

    ranked.sort_by_key(|&(short_side, index, _)| (Reverse(short_side), Reverse(index)));

    let &(_, _, hd) = ranked.first()?;
    let &(_, _, sd) = ranked
        .iter()
        .find(|&&(short_side, _, _)| short_side <= SD_MAX_SHORT_SIDE)
        .or_else(|| ranked.last())?;

    Some((hd.to_string(), sd.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::MediaFormat;

    fn format(url: &str, width: u32, height: u32) -> MediaFormat {
        MediaFormat {
            url: Some(url.to_string()),
            width: Some(width),
            height: Some(height),
            vcodec: Some("avc1".to_string()),
        }
    }

    fn entry(formats: Vec<MediaFormat>) -> StructuredEntry {
        StructuredEntry {
            vcodec: Some("avc1".to_string()),
            formats,
        }
    }

    #[test]
    fn test_hd_and_sd_under_threshold() {
        let e = entry(vec![
            format("https://v/480.mp4", 854, 480),
            format("https://v/1080.mp4", 1920, 1080),
        ]);
        assert_eq!(
            select_video_urls(&e),
            Some(("https://v/1080.mp4".to_string(), "https://v/480.mp4".to_string()))
        );
    }

    #[test]
    fn test_sd_falls_back_to_lowest() {
        let e = entry(vec![
            format("https://v/1080.mp4", 1920, 1080),
            format("https://v/720.mp4", 1280, 720),
        ]);
        assert_eq!(
            select_video_urls(&e),
            Some(("https://v/1080.mp4".to_string(), "https://v/720.mp4".to_string()))
        );
    }

    #[test]
    fn test_sd_picks_closest_under_threshold() {
        let e = entry(vec![
            format("https://v/240.mp4", 426, 240),
            format("https://v/600.mp4", 1066, 600),
            format("https://v/360.mp4", 640, 360),
            format("https://v/1080.mp4", 1920, 1080),
        ]);
        let (_, sd) = select_video_urls(&e).unwrap();
        assert_eq!(sd, "https://v/600.mp4");
    }

    #[test]
    fn test_portrait_uses_short_side() {
        // 720x1280 portrait is a 720p encoding, 480x854 is 480p.
        let e = entry(vec![
            format("https://v/p720.mp4", 720, 1280),
            format("https://v/p480.mp4", 480, 854),
        ]);
        assert_eq!(
            select_video_urls(&e),
            Some(("https://v/p720.mp4".to_string(), "https://v/p480.mp4".to_string()))
        );
    }

    #[test]
    fn test_single_format_hd_equals_sd() {
        let e = entry(vec![format("https://v/only.mp4", 1280, 720)]);
        let (hd, sd) = select_video_urls(&e).unwrap();
        assert_eq!(hd, sd);
    }

    #[test]
    fn test_equal_short_side_prefers_later_format() {
        let e = entry(vec![
            format("https://v/low-bitrate.mp4", 1280, 720),
            format("https://v/high-bitrate.mp4", 1280, 720),
        ]);
        let (hd, _) = select_video_urls(&e).unwrap();
        assert_eq!(hd, "https://v/high-bitrate.mp4");
    }

    #[test]
    fn test_audio_only_entry() {
        let mut e = entry(vec![format("https://v/a.mp4", 1, 1)]);
        e.vcodec = Some("none".to_string());
        assert_eq!(select_video_urls(&e), None);
    }

    #[test]
    fn test_skips_formats_without_dimensions_or_video() {
        let e = entry(vec![
            MediaFormat {
                url: Some("https://v/audio.m4a".to_string()),
                width: None,
                height: None,
                vcodec: Some("none".to_string()),
            },
            MediaFormat {
                url: Some("https://v/unknown.mp4".to_string()),
                width: None,
                height: Some(720),
                vcodec: None,
            },
        ]);
        assert_eq!(select_video_urls(&e), None);
    }
}
