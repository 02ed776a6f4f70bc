//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::Coordinator;

/// How long shutdown waits for running workers
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Coordinator {
    /// Gracefully shut down the coordinator
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs (`submit` returns `ShuttingDown`)
    /// 2. Cancels every running job and stops background services
    /// 3. Waits up to 30 seconds for the workers to record their final state
    /// 4. Emits `Event::Shutdown`
    ///
    /// Status queries keep working afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        {
            let active = self.jobs.active.lock().await;
            self.jobs.accepting_new.store(false, Ordering::SeqCst);
            tracing::info!("Stopped accepting new jobs");

            tracing::debug!(active_count = active.len(), "Cancelling active jobs");
            for token in active.values() {
                token.cancel();
            }
        }
        self.jobs.shutdown.cancel();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All active jobs finished"),
            Err(_) => {
                tracing::warn!("Timeout waiting for jobs to finish, proceeding with shutdown")
            }
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        !self.jobs.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.jobs.active.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active jobs to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
