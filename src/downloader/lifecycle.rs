//! Startup and shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;

use super::TubeDownloader;

impl TubeDownloader {
    /// Start the scheduler loop
    ///
    /// The loop admits queued tasks whenever the queue changes and runs until
    /// [`shutdown`](Self::shutdown). Starting it twice is harmless since
    /// admission is atomic, but only one loop is needed.
    pub fn start_scheduler(&self) -> tokio::task::JoinHandle<()> {
        self.queue_state.scheduler.spawn()
    }

    /// Whether new tasks are still accepted
    pub fn is_accepting(&self) -> bool {
        self.queue_state.accepting_new.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new tasks
    /// 2. Cancels the scheduler loop and the jobs watching the executor
    /// 3. Waits for those jobs to settle with a timeout (30 seconds)
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// Downloads already launched are not cancelled. Tasks keep whatever status
    /// they had; nothing is persisted.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new tasks
        self.queue_state.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        // 2. Stop admitting and watching
        self.queue_state.cancel.cancel();
        let jobs = self.queue_state.scheduler.jobs();
        jobs.close();
        tracing::info!(active_jobs = jobs.len(), "Signaled scheduler and jobs to stop");

        // 3. Wait for jobs with timeout
        let shutdown_timeout = std::time::Duration::from_secs(30);
        match tokio::time::timeout(shutdown_timeout, jobs.wait()).await {
            Ok(()) => {
                tracing::info!("All jobs stopped");
            }
            Err(_) => {
                tracing::warn!("Timeout waiting for jobs to stop, proceeding with shutdown");
            }
        }

        let running = self.backend.jobs().running();
        if running > 0 {
            tracing::info!(running, "Leaving launched downloads running");
        }

        // 4. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }
}
