//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Error;

/// Status label returned for ids the coordinator has never seen (or evicted)
pub const UNKNOWN_JOB_STATUS: &str = "Unknown ID";

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random (v4) job id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// What the engine should produce
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Best audio stream, transcoded to the configured audio codec
    Audio,
    /// Best combined video + audio stream
    #[default]
    Video,
}

impl Mode {
    /// Parse a caller-supplied mode string
    ///
    /// `"audio"` (any case) selects audio; every other value means video.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("audio") {
            Mode::Audio
        } else {
            Mode::Video
        }
    }

    /// Lowercase name, as used in logs and the API
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Audio => "audio",
            Mode::Video => "video",
        }
    }
}

/// Video quality preference for video-mode downloads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VideoQuality {
    /// Highest available quality
    #[default]
    Best,
    /// Lowest available quality
    Worst,
    /// Best stream whose height does not exceed this many lines (e.g. 720)
    MaxHeight(u32),
}

impl std::str::FromStr for VideoQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "best" => Ok(VideoQuality::Best),
            "worst" => Ok(VideoQuality::Worst),
            other => other
                .strip_suffix('p')
                .and_then(|h| h.parse::<u32>().ok())
                .filter(|h| *h > 0)
                .map(VideoQuality::MaxHeight)
                .ok_or_else(|| {
                    Error::invalid_request(
                        "quality",
                        format!("expected 'best', 'worst' or '<height>p', got '{}'", s),
                    )
                }),
        }
    }
}

/// Phase of a job, with the data each phase carries
///
/// `Done` and `Failed` are terminal: once a job reaches either, it never changes again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, worker not yet reporting
    Starting,
    /// Engine is transferring data; `percent` is None when the size is unknown
    Downloading {
        /// Whole percent of bytes downloaded
        percent: Option<u8>,
    },
    /// Transfer finished, post-processing (merge/transcode) in progress
    Processing,
    /// Engine call returned successfully
    Done,
    /// Engine call failed, timed out or was cancelled
    Failed {
        /// Short human-readable reason
        reason: String,
    },
}

impl JobStatus {
    /// Whether no further transitions are allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed { .. })
    }

    /// Human-readable status label exposed to polling clients
    pub fn label(&self) -> String {
        match self {
            JobStatus::Starting => "Starting...".to_string(),
            JobStatus::Downloading { percent: Some(p) } => format!("Downloading... {}%", p),
            JobStatus::Downloading { percent: None } => "Downloading...".to_string(),
            JobStatus::Processing => "Processing...".to_string(),
            JobStatus::Done => "Done".to_string(),
            JobStatus::Failed { reason } => format!("Failed: {}", reason),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Point-in-time `{status, progress}` view of a job, as returned by polling
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Status label (e.g. "Downloading... 50%", "Done", "Failed: ...")
    pub status: String,
    /// Progress percentage, 0 to 100
    pub progress: u8,
}

impl JobSnapshot {
    /// Sentinel returned for ids that are not tracked
    pub fn unknown() -> Self {
        Self {
            status: UNKNOWN_JOB_STATUS.to_string(),
            progress: 0,
        }
    }
}

/// A download submission as received from a client
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Source locator handed to the engine (usually a URL)
    #[serde(default)]
    pub url: String,
    /// Destination folder, relative to the configured download directory
    #[serde(default)]
    pub folder: String,
    /// "audio" for audio-only, anything else for video
    #[serde(default)]
    pub mode: String,
    /// Optional video quality ("best", "worst", "720p")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

/// Response body for a successful submission
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// The newly allocated job id
    pub id: JobId,
}

/// Full information about a tracked job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobInfo {
    /// Job identifier
    pub id: JobId,
    /// Source locator
    pub url: String,
    /// Destination folder (relative)
    pub folder: String,
    /// Requested mode
    pub mode: Mode,
    /// Structured phase
    pub state: JobStatus,
    /// Status label
    pub status: String,
    /// Progress percentage, 0 to 100
    pub progress: u8,
    /// Files the engine reported writing
    pub output_files: Vec<PathBuf>,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
    /// When the job reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

/// Metadata about a media item, looked up without downloading it
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MediaInfo {
    /// Title
    pub title: String,
    /// Duration in seconds
    pub duration_secs: Option<f64>,
    /// View count
    pub view_count: Option<u64>,
    /// Uploader name
    pub uploader: Option<String>,
    /// Upload date as reported by the source (YYYYMMDD)
    pub upload_date: Option<String>,
    /// Page URL
    pub webpage_url: Option<String>,
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted
    Submitted {
        /// Job ID
        id: JobId,
        /// Source locator
        url: String,
        /// Requested mode
        mode: Mode,
    },

    /// Job progress update
    Progress {
        /// Job ID
        id: JobId,
        /// Status label
        status: String,
        /// Progress percentage
        progress: u8,
    },

    /// Job finished successfully
    Completed {
        /// Job ID
        id: JobId,
        /// Files produced
        files: Vec<PathBuf>,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Failure reason
        reason: String,
    },

    /// Terminal jobs evicted by the retention sweeper
    Evicted {
        /// Evicted job IDs
        ids: Vec<JobId>,
    },

    /// Coordinator shutting down
    Shutdown,
}

impl Event {
    /// Event name used for the SSE `event:` field
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Submitted { .. } => "submitted",
            Event::Progress { .. } => "progress",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Evicted { .. } => "evicted",
            Event::Shutdown => "shutdown",
        }
    }
}

/// What the configured engine can do
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Engine implementation name
    pub engine: String,
    /// Whether downloads can run at all
    pub can_download: bool,
    /// Whether audio transcoding is available
    pub can_extract_audio: bool,
}
