//! Parser for yt-dlp command output

use super::traits::{EngineEvent, TransferProgress};
use crate::types::MediaInfo;
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Prefix of progress lines produced by our `--progress-template`
pub const PROGRESS_MARKER: &str = "media-dl:progress:";

/// Prefix of post-processor progress lines produced by our `--progress-template`
pub const POSTPROCESS_MARKER: &str = "media-dl:postprocess:";

/// `[download]  45.3% of ~  10.00MiB at ...` as printed without a progress template
static LEGACY_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[download\]\s+(?P<pct>\d+(?:\.\d+)?)%\s+of\s+~?\s*(?P<size>\d+(?:\.\d+)?)\s*(?P<unit>[KMGT]?i?B)\b",
    )
    .unwrap_or_else(|e| panic!("invalid legacy progress regex: {e}"))
});

/// Raw progress dictionary as serialized by `%(progress)j`
#[derive(Debug, Deserialize)]
struct RawProgress {
    status: String,
    #[serde(default)]
    downloaded_bytes: Option<f64>,
    #[serde(default)]
    total_bytes: Option<f64>,
    #[serde(default)]
    total_bytes_estimate: Option<f64>,
    #[serde(default)]
    filename: Option<String>,
}

/// Raw info dictionary as printed by `--dump-single-json`
#[derive(Debug, Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
}

/// Parse one stdout line into zero or more engine events
///
/// Recognizes our JSON progress template lines first, then falls back to the
/// human-readable lines yt-dlp prints by default.
pub fn parse_output_line(line: &str) -> Vec<EngineEvent> {
    let line = line.trim_end();

    if let Some(json) = line.strip_prefix(PROGRESS_MARKER) {
        return parse_progress_json(json).into_iter().collect();
    }

    if let Some(json) = line.strip_prefix(POSTPROCESS_MARKER) {
        // Any post-processor activity means the transfer itself is over
        return match serde_json::from_str::<RawProgress>(json) {
            Ok(_) => vec![EngineEvent::Finished],
            Err(e) => {
                tracing::debug!(error = %e, line, "Unparseable post-processor progress line");
                vec![]
            }
        };
    }

    if let Some(path) = line.strip_prefix("[download] Destination: ") {
        return vec![EngineEvent::Destination(PathBuf::from(path))];
    }

    if let Some(rest) = line.strip_prefix("[download] ")
        && let Some(path) = rest.strip_suffix(" has already been downloaded")
    {
        return vec![
            EngineEvent::Destination(PathBuf::from(path)),
            EngineEvent::Finished,
        ];
    }

    if let Some(path) = line.strip_prefix("[ExtractAudio] Destination: ") {
        return vec![
            EngineEvent::Finished,
            EngineEvent::Destination(PathBuf::from(path)),
        ];
    }

    if let Some(rest) = line.strip_prefix("[Merger] Merging formats into ") {
        let path = rest.trim_matches('"');
        return vec![
            EngineEvent::Finished,
            EngineEvent::Destination(PathBuf::from(path)),
        ];
    }

    if let Some(caps) = LEGACY_PROGRESS.captures(line) {
        let pct: f64 = caps["pct"].parse().unwrap_or(0.0);
        let size: f64 = caps["size"].parse().unwrap_or(0.0);
        let total = (size * unit_multiplier(&caps["unit"])) as u64;
        let downloaded = ((pct / 100.0) * total as f64) as u64;
        return vec![EngineEvent::Downloading(TransferProgress {
            downloaded_bytes: downloaded,
            total_bytes: None,
            total_bytes_estimate: Some(total),
        })];
    }

    vec![]
}

/// Parse the JSON payload of a download progress line
pub fn parse_progress_json(json: &str) -> Option<EngineEvent> {
    let raw: RawProgress = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable progress line");
            return None;
        }
    };

    match raw.status.as_str() {
        "downloading" => Some(EngineEvent::Downloading(TransferProgress {
            downloaded_bytes: raw.downloaded_bytes.map(to_bytes).unwrap_or(0),
            total_bytes: raw.total_bytes.map(to_bytes),
            total_bytes_estimate: raw.total_bytes_estimate.map(to_bytes),
        })),
        "finished" => Some(EngineEvent::Finished),
        other => {
            tracing::trace!(status = other, filename = ?raw.filename, "Ignoring progress status");
            None
        }
    }
}

/// Extract the message from a yt-dlp `ERROR:` line
pub fn parse_error_line(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("ERROR:")
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
}

/// Parse the output of `--dump-single-json`
pub fn parse_media_info(stdout: &[u8]) -> crate::Result<MediaInfo> {
    let raw: RawInfo = serde_json::from_slice(stdout)
        .map_err(|e| crate::Error::Engine(format!("unreadable media info: {}", e)))?;

    Ok(MediaInfo {
        title: raw.title.unwrap_or_default(),
        duration_secs: raw.duration,
        view_count: raw.view_count,
        uploader: raw.uploader,
        upload_date: raw.upload_date,
        webpage_url: raw.webpage_url,
    })
}

fn to_bytes(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn unit_multiplier(unit: &str) -> f64 {
    match unit {
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => 1.0,
    }
}
