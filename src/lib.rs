//! # media-dl
//!
//! Job-tracked media downloads on top of the `yt-dlp` extraction engine.
//!
//! Clients submit `{url, folder, mode}` and get a job id back immediately; the
//! download runs in its own task while the client polls `{status, progress}`
//! with that id until the job reports `Done` or `Failed: <reason>`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, Coordinator, DownloadRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = Coordinator::new(Config::default()).await?;
//!
//!     let id = coordinator
//!         .submit(DownloadRequest {
//!             url: "https://example.com/watch?v=abc".into(),
//!             folder: "music".into(),
//!             mode: "audio".into(),
//!             quality: None,
//!         })
//!         .await?;
//!
//!     loop {
//!         let snapshot = coordinator.query_status(id).await;
//!         println!("{} ({}%)", snapshot.status, snapshot.progress);
//!         if snapshot.status == "Done" || snapshot.status.starts_with("Failed") {
//!             break;
//!         }
//!         tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Download coordinator (decomposed into focused submodules)
pub mod coordinator;
/// Extraction engines (yt-dlp and fallbacks)
pub mod engine;
/// Error types
pub mod error;
/// In-memory job store
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::Coordinator;
pub use engine::{
    CliExtractionEngine, EngineCapabilities, EngineEvent, EngineRequest, ExtractionEngine,
    FetchOutcome, NoOpExtractionEngine, ProgressSink, TransferProgress,
};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use store::{JobHandle, JobStore};
pub use types::{
    Capabilities, DownloadRequest, Event, JobId, JobInfo, JobSnapshot, JobStatus, MediaInfo, Mode,
    SubmitResponse, UNKNOWN_JOB_STATUS, VideoQuality,
};

/// Helper function to run the coordinator with graceful signal handling.
///
/// Waits for a termination signal and then calls the coordinator's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, Coordinator, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let coordinator = Coordinator::new(Config::default()).await?;
///     coordinator.start_retention_sweeper();
///
///     // Run with automatic signal handling
///     run_with_shutdown(coordinator).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(coordinator: Coordinator) -> Result<()> {
    wait_for_signal().await;
    coordinator.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
