//! Per-job extraction worker.
//!
//! A worker runs one engine call for one job and translates the engine's
//! progress events into job status updates. It always leaves its job in a
//! terminal state: `Done` when the engine returns successfully, `Failed`
//! otherwise. A supervisor task marks the job failed if the worker panics.

use crate::engine::{EngineEvent, EngineRequest, ExtractionEngine, FetchOutcome};
use crate::error::{Error, Result};
use crate::store::JobHandle;
use crate::types::{JobId, JobStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

/// How long an engine gets to wind down after its job is cancelled
const CANCEL_GRACE: Duration = Duration::from_secs(5);

pub(crate) struct Worker {
    pub(crate) handle: JobHandle,
    pub(crate) engine: Arc<dyn ExtractionEngine>,
    pub(crate) request: EngineRequest,
    pub(crate) cancel: CancellationToken,
    pub(crate) timeout: Option<Duration>,
    pub(crate) concurrent_limit: Option<Arc<Semaphore>>,
}

impl Worker {
    /// Run the worker in its own task, supervised
    ///
    /// The job's entry in `active` is removed once the worker has finished,
    /// whether it returned or panicked.
    pub(crate) fn spawn(self, active: Arc<Mutex<HashMap<JobId, CancellationToken>>>) {
        let handle = self.handle.clone();
        let id = handle.id();

        tokio::spawn(async move {
            if let Err(e) = tokio::spawn(self.run()).await {
                tracing::error!(job_id = %id, error = %e, "Worker task crashed");
                handle.fail("worker crashed").await;
            }
            active.lock().await.remove(&id);
        });
    }

    async fn run(self) {
        let id = self.handle.id();

        let _permit = match self.concurrent_limit.clone() {
            Some(limit) => {
                tokio::select! {
                    permit = limit.acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            self.handle.fail("coordinator closed").await;
                            return;
                        }
                    },
                    _ = self.cancel.cancelled() => {
                        tracing::info!(job_id = %id, "Job cancelled before it started");
                        self.handle.fail(Error::Cancelled.failure_reason()).await;
                        return;
                    }
                }
            }
            None => None,
        };

        tracing::debug!(
            job_id = %id,
            engine = self.engine.name(),
            format = %self.request.format,
            output = %self.request.output_path_template().display(),
            "Worker started"
        );

        match self.execute().await {
            Ok(outcome) => {
                tracing::info!(job_id = %id, files = outcome.files.len(), "Job completed");
                self.handle.complete(outcome.files).await;
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Job failed");
                self.handle.fail(e.failure_reason()).await;
            }
        }
    }

    async fn execute(&self) -> Result<FetchOutcome> {
        let dir = &self.request.output_dir;
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create destination '{}': {}", dir.display(), e),
            ))
        })?;

        let (sink, mut events) = mpsc::unbounded_channel();
        let fetch = self.guarded_fetch(sink);
        tokio::pin!(fetch);

        let mut processing = false;
        let result = loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => self.apply(event, &mut processing).await,
                result = &mut fetch => break result,
            }
        };

        // Events sent right before the engine returned
        while let Ok(event) = events.try_recv() {
            self.apply(event, &mut processing).await;
        }

        result
    }

    /// Engine call bounded by the job deadline and the cancellation grace period
    async fn guarded_fetch(
        &self,
        sink: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<FetchOutcome> {
        let fetch = async {
            let call = self.engine.fetch(&self.request, sink, self.cancel.clone());
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| Error::Timeout(limit))?,
                None => call.await,
            }
        };

        tokio::select! {
            result = fetch => result,
            _ = async {
                self.cancel.cancelled().await;
                tokio::time::sleep(CANCEL_GRACE).await;
            } => {
                tracing::warn!(job_id = %self.handle.id(), "Engine ignored cancellation");
                Err(Error::Cancelled)
            }
        }
    }

    /// Translate one engine event into a status update
    ///
    /// Once the engine reported a finished transfer the job stays in
    /// `Processing`; later transfers (the audio half of a merged video) do not
    /// move it back to `Downloading`.
    async fn apply(&self, event: EngineEvent, processing: &mut bool) {
        match event {
            EngineEvent::Downloading(_) if *processing => {}
            EngineEvent::Downloading(progress) => {
                let percent = progress.percent();
                self.handle
                    .publish(JobStatus::Downloading { percent }, percent)
                    .await;
            }
            EngineEvent::Finished => {
                *processing = true;
                self.handle.publish(JobStatus::Processing, Some(100)).await;
            }
            EngineEvent::Destination(path) => {
                tracing::debug!(
                    job_id = %self.handle.id(),
                    path = %path.display(),
                    "Engine writing file"
                );
            }
        }
    }
}
