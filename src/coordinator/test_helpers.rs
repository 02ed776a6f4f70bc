//! Shared test helpers: in-memory engines and a coordinator factory.

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::engine::{
    EngineCapabilities, EngineEvent, EngineRequest, ExtractionEngine, FetchOutcome, ProgressSink,
    TransferProgress,
};
use crate::error::{Error, Result};
use crate::types::{DownloadRequest, JobId, JobSnapshot, MediaInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create a coordinator whose download directory lives in a fresh temp dir.
/// Returns the coordinator and the tempdir (which must be kept alive).
pub(crate) fn create_test_coordinator(
    engine: Arc<dyn ExtractionEngine>,
    configure: impl FnOnce(&mut Config),
) -> (Coordinator, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    configure(&mut config);

    (Coordinator::with_engine(config, engine), temp_dir)
}

/// A request with the given url, folder and mode
pub(crate) fn request(url: &str, folder: &str, mode: &str) -> DownloadRequest {
    DownloadRequest {
        url: url.to_string(),
        folder: folder.to_string(),
        mode: mode.to_string(),
        quality: None,
    }
}

/// Poll a job until `done` accepts its snapshot (panics after 5 seconds)
pub(crate) async fn wait_for(
    coordinator: &Coordinator,
    id: JobId,
    done: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = coordinator.query_status(id).await;
        if done(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job {id} stuck at {snapshot:?}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll a job until it reaches Done or Failed
pub(crate) async fn wait_for_terminal(coordinator: &Coordinator, id: JobId) -> JobSnapshot {
    wait_for(coordinator, id, |s| {
        s.status == "Done" || s.status.starts_with("Failed")
    })
    .await
}

/// Progress report for `downloaded` of `total` bytes
pub(crate) fn bytes(downloaded: u64, total: u64) -> EngineEvent {
    EngineEvent::Downloading(TransferProgress {
        downloaded_bytes: downloaded,
        total_bytes: Some(total),
        total_bytes_estimate: None,
    })
}

/// One instruction for [`ScriptedEngine`]
pub(crate) enum Step {
    /// Send this event to the progress sink
    Emit(EngineEvent),
    /// Return successfully with these files
    Succeed(Vec<PathBuf>),
    /// Return `Error::Engine(message)`
    Fail(String),
}

/// Engine driven step by step from the test through a channel
///
/// Serves a single fetch call; it records every request it receives.
pub(crate) struct ScriptedEngine {
    steps: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Step>>>,
    pub(crate) requests: std::sync::Mutex<Vec<EngineRequest>>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedSender<Step>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            steps: std::sync::Mutex::new(Some(rx)),
            requests: std::sync::Mutex::new(Vec::new()),
        });
        (engine, tx)
    }

    pub(crate) fn last_request(&self) -> EngineRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    async fn fetch(
        &self,
        request: &EngineRequest,
        sink: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        let mut steps = self.steps.lock().unwrap().take().unwrap();

        loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                step = steps.recv() => step,
            };
            match step {
                Some(Step::Emit(event)) => {
                    sink.send(event).ok();
                }
                Some(Step::Succeed(files)) => return Ok(FetchOutcome { files }),
                Some(Step::Fail(message)) => return Err(Error::Engine(message)),
                None => return Err(Error::Engine("script ended".into())),
            }
        }
    }

    async fn probe(&self, source: &str) -> Result<MediaInfo> {
        Ok(MediaInfo {
            title: format!("Title of {source}"),
            ..Default::default()
        })
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_download: true,
            can_extract_audio: true,
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Engine whose behavior is chosen by the source locator
///
/// - contains `panic`: panics
/// - contains `hang`: waits for cancellation
/// - contains `fail`: reports progress up to 100%, then fails
/// - otherwise: reports 25/50/75/100%, finishes and writes `<last segment>.mp3`
pub(crate) struct ProgressionEngine;

#[async_trait]
impl ExtractionEngine for ProgressionEngine {
    async fn fetch(
        &self,
        request: &EngineRequest,
        sink: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<FetchOutcome> {
        let source = request.source.as_str();
        if source.contains("panic") {
            panic!("engine exploded on {source}");
        }
        if source.contains("hang") {
            cancel.cancelled().await;
            return Err(Error::Cancelled);
        }

        for percent in [25u64, 50, 75, 100] {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(Duration::from_millis(2)) => {}
            }
            sink.send(bytes(percent * 10, 1000)).ok();
        }

        if source.contains("fail") {
            return Err(Error::Engine("simulated failure".into()));
        }
        sink.send(EngineEvent::Finished).ok();

        let name = source.rsplit('/').next().unwrap_or("media");
        let file = request.output_dir.join(format!("{name}.mp3"));
        tokio::fs::write(&file, b"audio").await?;
        Ok(FetchOutcome { files: vec![file] })
    }

    async fn probe(&self, source: &str) -> Result<MediaInfo> {
        if source.contains("fail") {
            return Err(Error::Engine("Video unavailable".into()));
        }
        Ok(MediaInfo {
            title: "Progression".into(),
            duration_secs: Some(60.0),
            view_count: Some(7),
            uploader: Some("tester".into()),
            upload_date: Some("20240101".into()),
            webpage_url: Some(source.to_string()),
        })
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            can_download: true,
            can_extract_audio: false,
        }
    }

    fn name(&self) -> &'static str {
        "progression"
    }
}
