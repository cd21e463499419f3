use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{GalleryEntry, GalleryExtractor, ToolOptions};

/// gallery-dl invoked with `--dump-json`, which lists media without
/// downloading anything.
///
/// Note: gallery-dl only supports cookies.txt files, not browser profiles.
#[derive(Debug, Clone)]
pub struct GalleryDl {
    options: ToolOptions,
}

impl GalleryDl {
    #[must_use]
    pub fn new(options: ToolOptions) -> Self {
        Self { options }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec!["--dump-json".to_string()];
        args.extend(self.options.cookie_args());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl GalleryExtractor for GalleryDl {
    async fn extract(&self, url: &str) -> Result<Vec<GalleryEntry>> {
        debug!(url = %url, "Running gallery-dl");

        let output = Command::new(&self.options.program)
            .args(self.args(url))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn gallery-dl")?
            .wait_with_output()
            .await
            .context("Failed to wait for gallery-dl")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("gallery-dl failed: {}", stderr.trim());
        }

        parse_dump_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse gallery-dl `--dump-json` output.
///
/// The output is an array of message arrays. Messages shaped
/// `[index, url, metadata]` carry media (or a URL queued for another
/// extractor); directory messages `[index, metadata]` are ignored.
///
/// # Errors
///
/// Returns an error if the output is not a JSON array.
pub fn parse_dump_json(stdout: &str) -> Result<Vec<GalleryEntry>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let messages: Vec<Value> =
        serde_json::from_str(trimmed).context("Failed to parse gallery-dl JSON output")?;

    let entries = messages
        .into_iter()
        .filter_map(|message| {
            let Value::Array(mut parts) = message else {
                return None;
            };
            if parts.len() < 2 || !parts[1].is_string() {
                return None;
            }
            let metadata = if parts.len() > 2 {
                parts.swap_remove(2)
            } else {
                Value::Null
            };
            let url = parts[1].as_str()?.to_string();
            Some(GalleryEntry { url, metadata })
        })
        .collect();

    Ok(entries)
}

/// Check if gallery-dl is available.
pub async fn is_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_messages() {
        let stdout = r#"[
            [2, {"category": "twitter", "user": {"name": "alice"}}],
            [3, "https://pbs.twimg.com/media/A?format=jpg&name=orig", {"num": 1, "extension": "jpg"}],
            [3, "https://pbs.twimg.com/media/B?format=png&name=orig", {"num": 2, "extension": "png"}]
        ]"#;
        let entries = parse_dump_json(stdout).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].url,
            "https://pbs.twimg.com/media/A?format=jpg&name=orig"
        );
        assert_eq!(entries[1].metadata["num"], 2);
    }

    #[test]
    fn test_parse_queue_message_without_metadata() {
        let entries = parse_dump_json(r#"[[6, "https://www.redgifs.com/watch/foo"]]"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata, Value::Null);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_dump_json("").unwrap().is_empty());
        assert!(parse_dump_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_output() {
        assert!(parse_dump_json("[error] Unsupported URL").is_err());
        assert!(parse_dump_json(r#"{"not": "an array"}"#).is_err());
    }

    #[test]
    fn test_args_contain_url() {
        let gallery = GalleryDl::new(ToolOptions::new("gallery-dl"));
        assert_eq!(
            gallery.args("https://www.reddit.com/r/a/comments/b"),
            vec![
                "--dump-json".to_string(),
                "https://www.reddit.com/r/a/comments/b".to_string()
            ]
        );
    }
}
