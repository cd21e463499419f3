use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{StructuredEntry, StructuredExtractor, ToolOptions};

/// yt-dlp invoked in metadata-only mode.
#[derive(Debug, Clone)]
pub struct YtDlp {
    options: ToolOptions,
}

impl YtDlp {
    #[must_use]
    pub fn new(options: ToolOptions) -> Self {
        Self { options }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--quiet".to_string(),
        ];
        args.extend(self.options.cookie_args());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl StructuredExtractor for YtDlp {
    async fn extract(&self, url: &str, cancel: CancellationToken) -> Result<Vec<StructuredEntry>> {
        debug!(url = %url, "Fetching yt-dlp metadata");

        let child = Command::new(&self.options.program)
            .args(self.args(url))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on cancellation must not leave yt-dlp running.
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn yt-dlp for metadata")?;

        let output = tokio::select! {
            output = child.wait_with_output() => output.context("Failed to wait for yt-dlp metadata")?,
            () = cancel.cancelled() => anyhow::bail!("yt-dlp metadata fetch cancelled"),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp metadata fetch failed: {}", stderr.trim());
        }

        parse_dump_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse `--dump-json` output: one JSON object per line, one line per entry.
///
/// Unparseable lines are skipped. Output that has content but no parseable
/// line at all is an error.
///
/// # Errors
///
/// Returns an error if no line of non-empty output parses.
pub fn parse_dump_json(stdout: &str) -> Result<Vec<StructuredEntry>> {
    let mut entries = Vec::new();
    let mut bad_lines = 0usize;

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<StructuredEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                bad_lines += 1;
                warn!(error = %e, "Skipping unparseable yt-dlp output line");
            }
        }
    }

    if entries.is_empty() && bad_lines > 0 {
        anyhow::bail!("Failed to parse yt-dlp metadata JSON ({bad_lines} bad lines)");
    }

    Ok(entries)
}

/// Check if yt-dlp is available.
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
