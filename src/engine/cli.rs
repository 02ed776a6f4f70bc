//! CLI-based extraction engine using the external yt-dlp binary

use super::parser::{parse_error_line, parse_media_info, parse_output_line};
use super::traits::{
    EngineCapabilities, EngineEvent, EngineRequest, ExtractionEngine, FetchOutcome, ProgressSink,
};
use crate::types::MediaInfo;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Download progress rendered as a compact JSON object, one per line
const DOWNLOAD_PROGRESS_TEMPLATE: &str = concat!(
    "download:media-dl:progress:",
    r#"{"status":"%(progress.status)s","#,
    r#""downloaded_bytes":%(progress.downloaded_bytes|null)s,"#,
    r#""total_bytes":%(progress.total_bytes|null)s,"#,
    r#""total_bytes_estimate":%(progress.total_bytes_estimate|null)s}"#,
);

/// Post-processor progress rendered the same way
const POSTPROCESS_PROGRESS_TEMPLATE: &str = concat!(
    "postprocess:media-dl:postprocess:",
    r#"{"status":"%(progress.status)s","postprocessor":"%(progress.postprocessor)s"}"#,
);

/// CLI-based extraction engine using the external `yt-dlp` binary
///
/// Progress is read line by line from the child's stdout; the last `ERROR:`
/// line on stderr becomes the failure reason when the process exits non-zero.
/// The child is killed when the job is cancelled or its future is dropped
/// (deadline expiry).
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{CliExtractionEngine, ExtractionEngine};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = CliExtractionEngine::from_path()
///     .expect("yt-dlp not found in PATH");
///
/// let info = engine.probe("https://example.com/watch?v=abc").await?;
/// println!("{} ({:?}s)", info.title, info.duration_secs);
/// # Ok(())
/// # }
/// ```
pub struct CliExtractionEngine {
    binary_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    ffmpeg_available: bool,
}

impl CliExtractionEngine {
    /// Create a new CLI engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_path: None,
            ffmpeg_available: which::which("ffmpeg").is_ok(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Point the engine at a specific ffmpeg binary
    pub fn with_ffmpeg(mut self, ffmpeg_path: PathBuf) -> Self {
        self.ffmpeg_available = ffmpeg_path.exists();
        self.ffmpeg_path = Some(ffmpeg_path);
        self
    }

    /// Path of the yt-dlp binary this engine runs
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }

    /// Command-line arguments for a download
    pub fn fetch_args(&self, request: &EngineRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--no-colors".into(),
            "--progress-template".into(),
            DOWNLOAD_PROGRESS_TEMPLATE.into(),
            "--progress-template".into(),
            POSTPROCESS_PROGRESS_TEMPLATE.into(),
            "-f".into(),
            request.format.clone().into(),
            "-o".into(),
            request.output_path_template().into_os_string(),
        ];

        if request.no_playlist {
            args.push("--no-playlist".into());
        }

        if let Some(audio) = &request.extract_audio {
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(audio.codec.clone().into());
            args.push("--audio-quality".into());
            args.push(audio_quality_arg(&audio.quality).into());
        }

        if let Some(ffmpeg) = &self.ffmpeg_path {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.clone().into_os_string());
        }

        // Everything after `--` is a locator, even if it starts with a dash
        args.push("--".into());
        args.push(request.source.clone().into());
        args
    }
}

/// yt-dlp reads a bare number as a VBR level, so plain bitrates get a `K` suffix
fn audio_quality_arg(quality: &str) -> String {
    if !quality.is_empty() && quality.chars().all(|c| c.is_ascii_digit()) && quality.len() > 2 {
        format!("{}K", quality)
    } else {
        quality.to_string()
    }
}

#[async_trait]
impl ExtractionEngine for CliExtractionEngine {
    async fn fetch(
        &self,
        request: &EngineRequest,
        sink: ProgressSink,
        cancel: CancellationToken,
    ) -> crate::Result<FetchOutcome> {
        let args = self.fetch_args(request);
        tracing::debug!(
            binary = %self.binary_path.display(),
            source = %request.source,
            format = %request.format,
            "Starting yt-dlp"
        );

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            crate::Error::ExternalTool("Failed to capture yt-dlp stdout".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            crate::Error::ExternalTool("Failed to capture yt-dlp stderr".to_string())
        })?;

        // Forward progress and remember every destination the engine announces
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut destinations: Vec<PathBuf> = Vec::new();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        for event in parse_output_line(&line) {
                            if let EngineEvent::Destination(path) = &event
                                && !destinations.contains(path)
                            {
                                destinations.push(path.clone());
                            }
                            // Receiver gone means the job is over; keep draining the pipe
                            let _ = sink.send(event);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Error reading yt-dlp stdout");
                        break;
                    }
                }
            }
            destinations
        });

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut last_error: Option<String> = None;
            let mut last_line: Option<String> = None;
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(message) = parse_error_line(&line) {
                    last_error = Some(message.to_string());
                } else if !line.trim().is_empty() {
                    tracing::debug!(line = %line, "yt-dlp stderr");
                    last_line = Some(line);
                }
            }
            last_error.or(last_line)
        });

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| {
                crate::Error::ExternalTool(format!("Failed to wait for yt-dlp: {}", e))
            })?,
            _ = cancel.cancelled() => {
                tracing::debug!(source = %request.source, "Cancellation requested, killing yt-dlp");
                let _ = child.kill().await;
                stdout_task.abort();
                stderr_task.abort();
                return Err(crate::Error::Cancelled);
            }
        };

        if !status.success() {
            stdout_task.abort();
            let detail = stderr_task.await.ok().flatten();
            let message = detail.unwrap_or_else(|| format!("yt-dlp exited with {}", status));
            return Err(crate::Error::Engine(message));
        }

        let destinations = stdout_task.await.unwrap_or_default();
        stderr_task.abort();

        let files = destinations.into_iter().filter(|p| p.exists()).collect();
        Ok(FetchOutcome { files })
    }

    async fn probe(&self, source: &str) -> crate::Result<MediaInfo> {
        let output = Command::new(&self.binary_path)
            .args([
                "--dump-single-json",
                "--skip-download",
                "--no-playlist",
                "--no-warnings",
                "--",
                source,
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .filter_map(parse_error_line)
                .last()
                .map(str::to_string)
                .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
            return Err(crate::Error::Engine(message));
        }

        parse_media_info(&output.stdout)
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_download: true,
            can_extract_audio: self.ffmpeg_available,
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
