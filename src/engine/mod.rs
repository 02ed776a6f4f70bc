//! Media extraction engines
//!
//! The core abstraction is the [`ExtractionEngine`] trait: resolve a source
//! locator, download it, optionally transcode it, and report progress along
//! the way. Implementations:
//!
//! - [`CliExtractionEngine`]: drives the external `yt-dlp` binary
//! - [`NoOpExtractionEngine`]: stub used when `yt-dlp` is unavailable
//!
//! [`from_config`] picks one based on the tools configuration.

mod cli;
mod noop;
pub mod parser;
mod traits;

pub use cli::CliExtractionEngine;
pub use noop::NoOpExtractionEngine;
pub use traits::{
    AudioExtraction, DEFAULT_OUTPUT_TEMPLATE, EngineCapabilities, EngineEvent, EngineRequest,
    ExtractionEngine, FetchOutcome, ProgressSink, TransferProgress,
};

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Select an engine from the tools configuration
///
/// An explicit `yt_dlp_path` wins; otherwise PATH is searched when
/// `search_path` is set. Falls back to [`NoOpExtractionEngine`].
pub fn from_config(tools: &ToolsConfig) -> Arc<dyn ExtractionEngine> {
    let engine = if let Some(ref path) = tools.yt_dlp_path {
        Some(CliExtractionEngine::new(path.clone()))
    } else if tools.search_path {
        CliExtractionEngine::from_path()
    } else {
        None
    };

    match engine {
        Some(engine) => {
            let engine = match tools.ffmpeg_path {
                Some(ref ffmpeg) => engine.with_ffmpeg(ffmpeg.clone()),
                None => engine,
            };
            tracing::info!(binary = %engine.binary_path().display(), "Using yt-dlp engine");
            Arc::new(engine)
        }
        None => {
            tracing::warn!("yt-dlp not found; downloads will fail until it is installed");
            Arc::new(NoOpExtractionEngine)
        }
    }
}
