//! Request validation and job creation.

use crate::engine::EngineRequest;
use crate::error::{Error, Result};
use crate::store::JobHandle;
use crate::types::{DownloadRequest, Event, JobId, Mode, VideoQuality};
use crate::utils::resolve_destination;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::Coordinator;
use super::worker::Worker;

impl Coordinator {
    /// Submit a download job
    ///
    /// Validates the request, records a new job in `Starting` state and spawns
    /// its worker. Returns as soon as the job is recorded; the download itself
    /// runs in the background and is observed through [`query_status`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] when `url`, `folder` or `mode` is empty, the
    ///   folder escapes the download directory, or `quality` is unrecognized
    /// - [`Error::ShuttingDown`] once [`shutdown`](Coordinator::shutdown) began
    ///
    /// No job is created when an error is returned.
    ///
    /// [`query_status`]: Coordinator::query_status
    pub async fn submit(&self, request: DownloadRequest) -> Result<JobId> {
        let url = required("url", &request.url)?;
        let folder = required("folder", &request.folder)?;
        let mode = Mode::parse(required("mode", &request.mode)?);

        let quality = match request.quality.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.parse::<VideoQuality>()?,
            _ => VideoQuality::Best,
        };

        let destination = resolve_destination(self.config.download_dir(), folder)?;

        let cancel = CancellationToken::new();
        let id = {
            // Checked under the active-jobs lock so shutdown cannot miss this job
            let mut active = self.jobs.active.lock().await;
            if !self.jobs.accepting_new.load(Ordering::SeqCst) {
                return Err(Error::ShuttingDown);
            }
            let id = self
                .store
                .create(url.to_string(), folder.to_string(), mode)
                .await;
            active.insert(id, cancel.clone());
            id
        };

        tracing::info!(
            job_id = %id,
            url,
            folder,
            mode = mode.as_str(),
            destination = %destination.display(),
            "Job submitted"
        );

        self.emit_event(Event::Submitted {
            id,
            url: url.to_string(),
            mode,
        });

        let worker = Worker {
            handle: JobHandle::new(id, self.store.clone(), self.event_tx.clone()),
            engine: self.engine.clone(),
            request: EngineRequest::for_mode(
                url,
                destination,
                mode,
                quality,
                &self.config.download,
            ),
            cancel,
            timeout: self.config.download.job_timeout,
            concurrent_limit: self.jobs.concurrent_limit.clone(),
        };
        worker.spawn(self.jobs.active.clone());

        Ok(id)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request(field, "must not be empty"));
    }
    Ok(trimmed)
}
