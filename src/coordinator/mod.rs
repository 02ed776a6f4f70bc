//! Download coordinator split into focused submodules.
//!
//! The `Coordinator` struct and its methods are organized by domain:
//! - [`submit`] - Request validation and job creation
//! - [`worker`] - Per-job extraction worker driving the engine
//! - [`status`] - Status queries, cancellation and metadata lookup
//! - [`retention`] - Eviction of finished jobs
//! - [`lifecycle`] - Shutdown coordination

mod lifecycle;
mod retention;
mod status;
mod submit;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use crate::config::Config;
use crate::engine::{self, ExtractionEngine};
use crate::error::{Error, Result};
use crate::store::JobStore;
use crate::types::{Capabilities, Event, JobId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Running-job bookkeeping
#[derive(Clone)]
pub(crate) struct JobControl {
    /// Cancellation tokens of jobs whose worker has not finished yet
    pub(crate) active: Arc<tokio::sync::Mutex<HashMap<JobId, CancellationToken>>>,
    /// Caps how many workers call the engine at once (None = unbounded)
    pub(crate) concurrent_limit: Option<Arc<tokio::sync::Semaphore>>,
    /// Set to false once shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled on shutdown to stop background services
    pub(crate) shutdown: CancellationToken,
}

/// Main coordinator instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the job store, hands out job ids, spawns one worker task per job and
/// answers status queries while those workers run.
#[derive(Clone)]
pub struct Coordinator {
    /// Job records, shared with the workers
    pub(crate) store: JobStore,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Extraction engine shared by all workers
    pub(crate) engine: Arc<dyn ExtractionEngine>,
    /// Running-job bookkeeping
    pub(crate) jobs: JobControl,
}

impl Coordinator {
    /// Create a new Coordinator instance
    ///
    /// Validates the configuration, creates the download directory and picks
    /// an extraction engine from the tools configuration.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let engine = engine::from_config(&config.tools);
        Ok(Self::with_engine(config, engine))
    }

    /// Create a coordinator around an explicit engine
    ///
    /// Does not touch the filesystem; workers create their destination
    /// directories on demand.
    pub fn with_engine(config: Config, engine: Arc<dyn ExtractionEngine>) -> Self {
        // Buffer of 1000 events per subscriber before it starts lagging
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let concurrent_limit = config
            .download
            .max_concurrent_jobs
            .map(|limit| Arc::new(tokio::sync::Semaphore::new(limit)));

        let caps = engine.capabilities();
        tracing::info!(
            engine = engine.name(),
            can_download = caps.can_download,
            can_extract_audio = caps.can_extract_audio,
            max_concurrent_jobs = ?config.download.max_concurrent_jobs,
            "Extraction engine initialized"
        );

        Self {
            store: JobStore::new(),
            event_tx,
            config: Arc::new(config),
            engine,
            jobs: JobControl {
                active: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
                concurrent_limit,
                accepting_new: Arc::new(AtomicBool::new(true)),
                shutdown: CancellationToken::new(),
            },
        }
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls more than 1000 events behind receives `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, Coordinator};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let coordinator = Coordinator::new(Config::default()).await?;
    ///
    ///     let mut events = coordinator.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "job event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration (cheap Arc clone)
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Query what the configured engine can do
    pub fn capabilities(&self) -> Capabilities {
        let caps = self.engine.capabilities();
        Capabilities {
            engine: self.engine.name().to_string(),
            can_download: caps.can_download,
            can_extract_audio: caps.can_extract_audio,
        }
    }

    /// Emit an event to all subscribers
    ///
    /// Events are silently dropped when nobody is subscribed.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:5000).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let coordinator = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(coordinator, config).await })
    }
}
