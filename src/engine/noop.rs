//! No-op extraction engine for graceful degradation

use super::traits::{
    EngineCapabilities, EngineRequest, ExtractionEngine, FetchOutcome, ProgressSink,
};
use crate::types::MediaInfo;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// No-op engine used when no yt-dlp binary is available or configured
///
/// Every call fails with `Error::NotSupported`, so submitted jobs end in a
/// `Failed` state with an actionable reason instead of hanging in `Starting`.
///
/// # Examples
///
/// ```
/// use media_dl::engine::{ExtractionEngine, NoOpExtractionEngine};
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = NoOpExtractionEngine;
/// assert!(engine.probe("https://example.com/a").await.is_err());
/// assert!(!engine.capabilities().can_download);
/// # }
/// ```
pub struct NoOpExtractionEngine;

const MISSING_BINARY: &str = "downloading requires the external yt-dlp binary. \
     Configure yt_dlp_path in config or ensure yt-dlp is in PATH.";

#[async_trait]
impl ExtractionEngine for NoOpExtractionEngine {
    async fn fetch(
        &self,
        _request: &EngineRequest,
        _sink: ProgressSink,
        _cancel: CancellationToken,
    ) -> crate::Result<FetchOutcome> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    async fn probe(&self, _source: &str) -> crate::Result<MediaInfo> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_download: false,
            can_extract_audio: false,
        }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
