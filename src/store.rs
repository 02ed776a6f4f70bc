//! In-memory job store
//!
//! The store owns the id -> job map. The coordinator inserts records; each
//! job's worker mutates its own record through a [`JobHandle`]; status queries
//! only read. Every update replaces the status and progress together under the
//! write lock, so readers never observe a half-applied update.

use crate::types::{Event, JobId, JobInfo, JobSnapshot, JobStatus, Mode};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

/// One tracked job
#[derive(Debug, Clone)]
pub(crate) struct JobRecord {
    pub(crate) id: JobId,
    pub(crate) url: String,
    pub(crate) folder: String,
    pub(crate) mode: Mode,
    pub(crate) status: JobStatus,
    pub(crate) progress: u8,
    pub(crate) output_files: Vec<PathBuf>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status.label(),
            progress: self.progress,
        }
    }

    fn info(&self) -> JobInfo {
        JobInfo {
            id: self.id,
            url: self.url.clone(),
            folder: self.folder.clone(),
            mode: self.mode,
            state: self.status.clone(),
            status: self.status.label(),
            progress: self.progress,
            output_files: self.output_files.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            finished_at: self.finished_at,
        }
    }
}

/// Shared, synchronized map of jobs (cheap to clone)
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job in `Starting` state and return its freshly generated id
    ///
    /// The id is generated under the write lock and regenerated on the
    /// (astronomically unlikely) collision with a tracked id.
    pub(crate) async fn create(&self, url: String, folder: String, mode: Mode) -> JobId {
        let mut jobs = self.jobs.write().await;
        let mut id = JobId::new();
        while jobs.contains_key(&id) {
            id = JobId::new();
        }

        let now = Utc::now();
        jobs.insert(
            id,
            JobRecord {
                id,
                url,
                folder,
                mode,
                status: JobStatus::Starting,
                progress: 0,
                output_files: Vec::new(),
                created_at: now,
                updated_at: now,
                finished_at: None,
            },
        );
        id
    }

    /// Current `{status, progress}` of a job, None if untracked
    pub async fn snapshot(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.read().await.get(&id).map(JobRecord::snapshot)
    }

    /// Full record of a job, None if untracked
    pub async fn get(&self, id: JobId) -> Option<JobInfo> {
        self.jobs.read().await.get(&id).map(JobRecord::info)
    }

    /// All tracked jobs, oldest first
    pub async fn list(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.read().await;
        let mut infos: Vec<JobInfo> = jobs.values().map(JobRecord::info).collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }

    /// Number of tracked jobs
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether no jobs are tracked
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Whether the job exists and has reached Done or Failed
    pub(crate) async fn is_terminal(&self, id: JobId) -> Option<bool> {
        self.jobs
            .read()
            .await
            .get(&id)
            .map(|record| record.status.is_terminal())
    }

    /// Apply a status transition
    ///
    /// `progress` of None keeps the current value; a lower value than the
    /// current one is raised to it, so progress never goes backwards. Returns
    /// the new snapshot, or None if the job is untracked or already terminal.
    pub(crate) async fn transition(
        &self,
        id: JobId,
        status: JobStatus,
        progress: Option<u8>,
    ) -> Option<JobSnapshot> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id)?;

        if record.status.is_terminal() {
            tracing::debug!(
                job_id = %id,
                current = %record.status,
                rejected = %status,
                "Ignoring update to finished job"
            );
            return None;
        }

        let now = Utc::now();
        let progress = progress
            .map(|p| p.min(100).max(record.progress))
            .unwrap_or(record.progress);

        // Keep the label in step with the clamped progress
        let status = match status {
            JobStatus::Downloading { percent: Some(p) } if p < progress => JobStatus::Downloading {
                percent: Some(progress),
            },
            other => other,
        };

        if status.is_terminal() {
            record.finished_at = Some(now);
        }
        record.status = status;
        record.progress = progress;
        record.updated_at = now;

        Some(record.snapshot())
    }

    /// Record a file the engine produced for a running job
    pub(crate) async fn set_output_files(&self, id: JobId, files: Vec<PathBuf>) {
        if let Some(record) = self.jobs.write().await.get_mut(&id) {
            record.output_files = files;
        }
    }

    /// Remove terminal jobs that finished before `cutoff`; returns their ids
    pub(crate) async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|record| record.finished_at.is_some_and(|at| at < cutoff))
            .map(|record| record.id)
            .collect();

        for id in &expired {
            jobs.remove(id);
        }
        expired
    }
}

/// Write handle to one job, owned by that job's worker
///
/// Publishing through the handle updates the store and broadcasts the matching
/// [`Event`]. Updates after the job reached a terminal state are dropped.
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    store: JobStore,
    event_tx: broadcast::Sender<Event>,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, store: JobStore, event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            id,
            store,
            event_tx,
        }
    }

    /// The job this handle writes to
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Publish a non-terminal status
    pub async fn publish(&self, status: JobStatus, progress: Option<u8>) -> bool {
        match self.store.transition(self.id, status, progress).await {
            Some(snapshot) => {
                self.event_tx
                    .send(Event::Progress {
                        id: self.id,
                        status: snapshot.status,
                        progress: snapshot.progress,
                    })
                    .ok();
                true
            }
            None => false,
        }
    }

    /// Mark the job Done at 100% with the files it produced
    pub async fn complete(&self, files: Vec<PathBuf>) -> bool {
        self.store.set_output_files(self.id, files.clone()).await;
        let accepted = self.publish(JobStatus::Done, Some(100)).await;
        if accepted {
            self.event_tx
                .send(Event::Completed { id: self.id, files })
                .ok();
        }
        accepted
    }

    /// Mark the job Failed, keeping its last known progress
    pub async fn fail(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let accepted = self
            .publish(
                JobStatus::Failed {
                    reason: reason.clone(),
                },
                None,
            )
            .await;
        if accepted {
            self.event_tx
                .send(Event::Failed {
                    id: self.id,
                    reason,
                })
                .ok();
        }
        accepted
    }
}
