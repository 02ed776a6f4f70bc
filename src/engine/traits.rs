//! Traits and types for the extraction engine

use crate::config::DownloadConfig;
use crate::types::{MediaInfo, Mode, VideoQuality};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Output file name template, relative to the job's destination directory
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Channel the engine reports progress into
///
/// Events are delivered in the order the engine emits them. The channel closes
/// when the engine call returns and drops its sender.
pub type ProgressSink = tokio::sync::mpsc::UnboundedSender<EngineEvent>;

/// Byte counters from one "downloading" progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    /// Bytes downloaded so far
    pub downloaded_bytes: u64,
    /// Exact total size, when the source advertises it
    pub total_bytes: Option<u64>,
    /// Estimated total size (fragmented streams)
    pub total_bytes_estimate: Option<u64>,
}

impl TransferProgress {
    /// Whole percent downloaded: `floor(downloaded / total * 100)`, capped at 100
    ///
    /// Uses `total_bytes`, falling back to `total_bytes_estimate`. Returns None
    /// when neither is known (or the known total is zero).
    pub fn percent(&self) -> Option<u8> {
        let total = self
            .total_bytes
            .filter(|t| *t > 0)
            .or(self.total_bytes_estimate.filter(|t| *t > 0))?;
        let percent = (self.downloaded_bytes as u128 * 100) / total as u128;
        Some(percent.min(100) as u8)
    }
}

/// A progress event reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Data is being transferred
    Downloading(TransferProgress),
    /// Transfer complete; post-processing (merge, transcode) is about to start
    Finished,
    /// The engine announced a file it is writing or produced
    Destination(PathBuf),
}

/// Audio post-processing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    /// Target codec/container (e.g. "mp3")
    pub codec: String,
    /// Target bitrate in kbps (e.g. "192")
    pub quality: String,
}

/// Everything the engine needs for one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Source locator (URL or engine-specific search string)
    pub source: String,
    /// Directory the output lands in (already created)
    pub output_dir: PathBuf,
    /// Output file name template
    pub output_template: String,
    /// Format selector
    pub format: String,
    /// Transcode to audio after download
    pub extract_audio: Option<AudioExtraction>,
    /// Only fetch the single item, never a whole playlist
    pub no_playlist: bool,
}

impl EngineRequest {
    /// Build the engine request for a job
    ///
    /// Audio mode requests the best audio stream and transcodes it using the
    /// configured codec and bitrate. Video mode requests the best combined
    /// video+audio stream, narrowed by `quality`.
    pub fn for_mode(
        source: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        mode: Mode,
        quality: VideoQuality,
        download: &DownloadConfig,
    ) -> Self {
        let (format, extract_audio) = match mode {
            Mode::Audio => (
                "bestaudio/best".to_string(),
                Some(AudioExtraction {
                    codec: download.audio_codec.clone(),
                    quality: download.audio_quality.clone(),
                }),
            ),
            Mode::Video => (video_format(quality), None),
        };

        Self {
            source: source.into(),
            output_dir: output_dir.into(),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            format,
            extract_audio,
            no_playlist: true,
        }
    }

    /// Full output path template (`<output_dir>/<output_template>`)
    pub fn output_path_template(&self) -> PathBuf {
        self.output_dir.join(&self.output_template)
    }
}

fn video_format(quality: VideoQuality) -> String {
    match quality {
        VideoQuality::Best => "bestvideo+bestaudio/best".to_string(),
        VideoQuality::Worst => "worst[ext=mp4]/worst".to_string(),
        VideoQuality::MaxHeight(h) => format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            h = h
        ),
    }
}

/// Result of a successful engine call
#[must_use]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Final files on disk, in the order the engine reported them
    pub files: Vec<PathBuf>,
}

/// Capabilities of an engine implementation
#[derive(Debug, Clone, Copy)]
pub struct EngineCapabilities {
    /// Can download at all
    pub can_download: bool,
    /// Can transcode to audio (needs ffmpeg)
    pub can_extract_audio: bool,
}

/// Trait for media extraction engines
///
/// Implementations resolve a source locator to a downloadable stream, write it
/// to disk, and report progress into a [`ProgressSink`]. A call blocks (async)
/// for the whole download including post-processing.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{CliExtractionEngine, EngineRequest, ExtractionEngine};
/// use media_dl::config::DownloadConfig;
/// use media_dl::types::{Mode, VideoQuality};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = CliExtractionEngine::from_path().expect("yt-dlp not found in PATH");
/// let request = EngineRequest::for_mode(
///     "https://example.com/watch?v=abc",
///     "downloads/music",
///     Mode::Audio,
///     VideoQuality::Best,
///     &DownloadConfig::default(),
/// );
///
/// let (sink, mut events) = tokio::sync::mpsc::unbounded_channel();
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("{:?}", event);
///     }
/// });
///
/// let outcome = engine.fetch(&request, sink, CancellationToken::new()).await?;
/// println!("wrote {:?}", outcome.files);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Download (and post-process) one item
    ///
    /// # Errors
    ///
    /// - [`Error::Engine`](crate::Error::Engine) when the engine reports a failure
    /// - [`Error::ExternalTool`](crate::Error::ExternalTool) when it cannot be started
    /// - [`Error::Cancelled`](crate::Error::Cancelled) when `cancel` fires first
    /// - [`Error::NotSupported`](crate::Error::NotSupported) for stub engines
    async fn fetch(
        &self,
        request: &EngineRequest,
        sink: ProgressSink,
        cancel: CancellationToken,
    ) -> crate::Result<FetchOutcome>;

    /// Look up metadata without downloading
    async fn probe(&self, source: &str) -> crate::Result<MediaInfo>;

    /// Query capabilities of this engine
    fn capabilities(&self) -> EngineCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
