//! Status queries, cancellation and metadata lookup.

use crate::error::{Error, Result};
use crate::types::{JobId, JobInfo, JobSnapshot, MediaInfo};

use super::Coordinator;

impl Coordinator {
    /// Current `{status, progress}` of a job
    ///
    /// Never fails: ids that were never issued (or have been evicted) yield
    /// [`JobSnapshot::unknown`], i.e. `{"Unknown ID", 0}`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use media_dl::{Config, Coordinator, DownloadRequest};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let coordinator = Coordinator::new(Config::default()).await?;
    /// let id = coordinator
    ///     .submit(DownloadRequest {
    ///         url: "https://example.com/watch?v=abc".into(),
    ///         folder: "music".into(),
    ///         mode: "audio".into(),
    ///         quality: None,
    ///     })
    ///     .await?;
    ///
    /// let snapshot = coordinator.query_status(id).await;
    /// println!("{} ({}%)", snapshot.status, snapshot.progress);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn query_status(&self, id: JobId) -> JobSnapshot {
        self.store
            .snapshot(id)
            .await
            .unwrap_or_else(JobSnapshot::unknown)
    }

    /// Full record of a job, None if unknown
    pub async fn get_job(&self, id: JobId) -> Option<JobInfo> {
        self.store.get(id).await
    }

    /// All tracked jobs, oldest first
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        self.store.list().await
    }

    /// Cancel a running job
    ///
    /// Signals the job's worker, which stops the engine and finishes the job
    /// as `Failed: cancelled`. Returns once the signal is sent, not when the
    /// worker has stopped.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the id is unknown
    /// - [`Error::AlreadyFinished`] if the job is already Done or Failed
    pub async fn cancel(&self, id: JobId) -> Result<()> {
        match self.store.is_terminal(id).await {
            None => return Err(Error::NotFound(id.to_string())),
            Some(true) => return Err(Error::AlreadyFinished(id.to_string())),
            Some(false) => {}
        }

        let active = self.jobs.active.lock().await;
        if let Some(token) = active.get(&id) {
            token.cancel();
            tracing::info!(job_id = %id, "Cancellation requested");
        }

        Ok(())
    }

    /// Look up metadata about a media item without downloading it
    pub async fn probe(&self, url: &str) -> Result<MediaInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::invalid_request("url", "must not be empty"));
        }

        tracing::debug!(url, engine = self.engine.name(), "Probing media");
        self.engine.probe(url).await
    }
}
