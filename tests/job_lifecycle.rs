//! End-to-end job lifecycle through the public API
//!
//! Drives the coordinator with an engine controlled by the test (to observe
//! each phase while polling) and, on unix, with a fake `yt-dlp` script so the
//! CLI engine, progress parser and worker run together.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use media_dl::{
    Config, Coordinator, DownloadRequest, EngineCapabilities, EngineEvent, EngineRequest, Error,
    Event, ExtractionEngine, FetchOutcome, JobId, JobSnapshot, MediaInfo, ProgressSink,
    TransferProgress, UNKNOWN_JOB_STATUS,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Engine that emits whatever the test pushes, and returns when the channel closes
struct GatedEngine {
    events: Mutex<mpsc::UnboundedReceiver<EngineEvent>>,
}

impl GatedEngine {
    fn new() -> (Arc<Self>, mpsc::UnboundedSender<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            events: Mutex::new(rx),
        });
        (engine, tx)
    }
}

#[async_trait]
impl ExtractionEngine for GatedEngine {
    async fn fetch(
        &self,
        _request: &EngineRequest,
        sink: ProgressSink,
        cancel: CancellationToken,
    ) -> media_dl::Result<FetchOutcome> {
        let mut events = self.events.lock().await;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => { let _ = sink.send(event); }
                    None => return Ok(FetchOutcome::default()),
                },
                _ = cancel.cancelled() => return Err(Error::Cancelled),
            }
        }
    }

    async fn probe(&self, source: &str) -> media_dl::Result<MediaInfo> {
        Ok(MediaInfo {
            title: source.to_string(),
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
        "gated"
    }
}

fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.tools.search_path = false;
    config
}

fn audio_request(url: &str) -> DownloadRequest {
    DownloadRequest {
        url: url.to_string(),
        folder: "music".to_string(),
        mode: "audio".to_string(),
        quality: None,
    }
}

async fn poll_until(
    coordinator: &Coordinator,
    id: JobId,
    pred: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = coordinator.query_status(id).await;
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting, last snapshot: {snapshot:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn downloading(downloaded: u64, total: u64) -> EngineEvent {
    EngineEvent::Downloading(TransferProgress {
        downloaded_bytes: downloaded,
        total_bytes: Some(total),
        total_bytes_estimate: None,
    })
}

#[tokio::test]
async fn test_polling_observes_every_phase() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (engine, events) = GatedEngine::new();
    let coordinator = Coordinator::with_engine(test_config(&temp_dir), engine);

    let id = coordinator
        .submit(audio_request("https://example.com/watch?v=a"))
        .await
        .unwrap();

    let snapshot = coordinator.query_status(id).await;
    assert_eq!(snapshot.status, "Starting...");
    assert_eq!(snapshot.progress, 0);

    events.send(downloading(40, 100)).unwrap();
    let snapshot = poll_until(&coordinator, id, |s| s.progress == 40).await;
    assert_eq!(snapshot.status, "Downloading... 40%");

    events.send(EngineEvent::Finished).unwrap();
    let snapshot = poll_until(&coordinator, id, |s| s.status == "Processing...").await;
    assert_eq!(snapshot.progress, 100);

    drop(events);
    let snapshot = poll_until(&coordinator, id, |s| s.status == "Done").await;
    assert_eq!(snapshot.progress, 100);

    assert!(temp_dir.path().join("downloads/music").is_dir());
}

#[tokio::test]
async fn test_unknown_id_reports_sentinel() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (engine, _events) = GatedEngine::new();
    let coordinator = Coordinator::with_engine(test_config(&temp_dir), engine);

    let snapshot = coordinator.query_status(JobId::new()).await;
    assert_eq!(snapshot.status, UNKNOWN_JOB_STATUS);
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test]
async fn test_cancelled_job_reports_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (engine, events) = GatedEngine::new();
    let coordinator = Coordinator::with_engine(test_config(&temp_dir), engine);

    let id = coordinator
        .submit(audio_request("https://example.com/watch?v=b"))
        .await
        .unwrap();
    events.send(downloading(10, 100)).unwrap();
    poll_until(&coordinator, id, |s| s.progress == 10).await;

    coordinator.cancel(id).await.unwrap();
    let snapshot = poll_until(&coordinator, id, |s| s.status.starts_with("Failed")).await;
    assert_eq!(snapshot.status, "Failed: cancelled");
    assert_eq!(snapshot.progress, 10);
}

#[tokio::test]
async fn test_shutdown_rejects_new_submissions() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (engine, _events) = GatedEngine::new();
    let coordinator = Coordinator::with_engine(test_config(&temp_dir), engine);
    let mut subscriber = coordinator.subscribe();

    let id = coordinator
        .submit(audio_request("https://example.com/watch?v=c"))
        .await
        .unwrap();
    coordinator.shutdown().await.unwrap();

    assert!(coordinator.is_shutting_down());
    assert_eq!(
        coordinator.query_status(id).await.status,
        "Failed: cancelled"
    );

    let err = coordinator
        .submit(audio_request("https://example.com/watch?v=d"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ShuttingDown));

    let mut saw_shutdown = false;
    while let Ok(event) = subscriber.try_recv() {
        if matches!(event, Event::Shutdown) {
            saw_shutdown = true;
        }
    }
    assert!(saw_shutdown);
}

#[cfg(unix)]
mod fake_yt_dlp {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    async fn coordinator_with_script(temp_dir: &TempDir, body: &str) -> Coordinator {
        let mut config = test_config(temp_dir);
        config.tools.yt_dlp_path = Some(write_script(temp_dir.path(), body));
        Coordinator::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_cli_engine_job_completes_with_output_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output = temp_dir.path().join("downloads/music/Song.mp3");
        let coordinator = coordinator_with_script(
            &temp_dir,
            &format!(
                r#"echo 'media-dl:progress:{{"status":"downloading","downloaded_bytes":25,"total_bytes":100}}'
echo 'media-dl:progress:{{"status":"downloading","downloaded_bytes":100,"total_bytes":100}}'
echo 'media-dl:progress:{{"status":"finished","downloaded_bytes":100,"total_bytes":100}}'
touch '{out}'
echo '[ExtractAudio] Destination: {out}'
exit 0"#,
                out = output.display()
            ),
        )
        .await;
        assert_eq!(coordinator.capabilities().engine, "yt-dlp");

        let mut subscriber = coordinator.subscribe();
        let id = coordinator
            .submit(audio_request("https://example.com/watch?v=e"))
            .await
            .unwrap();

        let snapshot = poll_until(&coordinator, id, |s| s.status == "Done").await;
        assert_eq!(snapshot.progress, 100);

        let job = coordinator.get_job(id).await.unwrap();
        assert_eq!(job.output_files, vec![output]);

        let mut progress = Vec::new();
        while let Ok(event) = subscriber.try_recv() {
            if let Event::Progress { id: event_id, progress: p, .. } = event
                && event_id == id
            {
                progress.push(p);
            }
        }
        assert!(progress.contains(&25));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_cli_engine_failure_surfaces_error_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator_with_script(
            &temp_dir,
            r#"echo 'ERROR: [youtube] abc: Video unavailable' >&2
exit 1"#,
        )
        .await;

        let id = coordinator
            .submit(audio_request("https://example.com/watch?v=f"))
            .await
            .unwrap();

        let snapshot = poll_until(&coordinator, id, |s| s.status.starts_with("Failed")).await;
        assert!(
            snapshot.status.contains("Video unavailable"),
            "unexpected status: {}",
            snapshot.status
        );
    }
}
