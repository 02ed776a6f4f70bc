//! Eviction of finished jobs.

use crate::types::{Event, JobId};
use tokio::time::MissedTickBehavior;

use super::Coordinator;

impl Coordinator {
    /// Start the retention sweeper background task
    ///
    /// Every `retention.sweep_interval` the sweeper evicts jobs that have been
    /// Done or Failed for longer than `retention.completed_job_ttl`. Evicted ids
    /// report `Unknown ID` afterwards. The task exits on shutdown.
    pub fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        let interval = self.config.retention.sweep_interval;

        if interval.is_zero() {
            tracing::warn!("Retention sweep interval is zero, skipping retention sweeper");
            return tokio::spawn(async {});
        }

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = coordinator.jobs.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        coordinator.sweep_expired().await;
                    }
                }
            }
            tracing::debug!("Retention sweeper stopped");
        });

        tracing::info!(
            interval_secs = interval.as_secs(),
            ttl_secs = self.config.retention.completed_job_ttl.as_secs(),
            "Retention sweeper started"
        );

        handle
    }

    /// Evict every job that finished more than the configured TTL ago
    pub async fn sweep_expired(&self) -> Vec<JobId> {
        let ttl = self.config.retention.completed_job_ttl;
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| chrono::Utc::now().checked_sub_signed(ttl))
        else {
            return Vec::new();
        };

        let evicted = self.store.evict_finished_before(cutoff).await;
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), "Evicted finished jobs");
            self.emit_event(Event::Evicted {
                ids: evicted.clone(),
            });
        }
        evicted
    }
}
