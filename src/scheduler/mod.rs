//! Scheduler Loop
//!
//! Watches the queue and, after every published change, admits queued tasks
//! into free concurrency slots. Each admitted task gets a job that talks to the
//! executor and feeds the outcome back into the store as intents:
//!
//! ```text
//! queued --admit--> starting --ack--> in_progress --complete--> ready
//!                       |                  |
//!                       +------ fail ------+---------> error
//! ```
//!
//! Jobs never hold a reference into a task. They carry `(id, attempt)` and
//! every result they report is checked by the store, so results for removed,
//! paused or re-admitted tasks are dropped.

use crate::executor::{ExecutorClient, StartRequest, Waited};
use crate::queue::{Admission, Intent, Outcome, QueueStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Drives queued tasks through the executor under the concurrency budget
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<QueueStore>,
    client: ExecutorClient,
    trust_acknowledgement: bool,
    jobs: TaskTracker,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler
    ///
    /// With `trust_acknowledgement` set, tasks go straight to `ready` once the
    /// executor accepts them instead of waiting for a completion report.
    pub fn new(
        store: Arc<QueueStore>,
        client: ExecutorClient,
        trust_acknowledgement: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            client,
            trust_acknowledgement,
            jobs: TaskTracker::new(),
            cancel,
        }
    }

    /// Tracker of running jobs, used to wait for them on shutdown
    pub fn jobs(&self) -> &TaskTracker {
        &self.jobs
    }

    /// Spawn the scheduling loop
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run().await })
    }

    /// Run the scheduling loop until cancelled
    pub async fn run(&self) {
        let mut changes = self.store.subscribe();
        tracing::info!(executor = self.client.name(), "Scheduler started");

        loop {
            self.admit_ready_tasks();

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Admit as many queued tasks as the budget allows and launch their jobs
    pub fn admit_ready_tasks(&self) -> usize {
        let admitted = self.store.admit();
        let count = admitted.len();

        for admission in admitted {
            let store = self.store.clone();
            let client = self.client.clone();
            let trust = self.trust_acknowledgement;
            let cancel = self.cancel.clone();
            let job_id = admission.id.clone();

            self.jobs.spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(video_id = %job_id, "Job cancelled by shutdown");
                    }
                    _ = drive(store, client, admission, trust) => {}
                }
            });
        }

        count
    }
}

async fn drive(store: Arc<QueueStore>, client: ExecutorClient, admission: Admission, trust: bool) {
    let Admission {
        id,
        attempt,
        title,
        quality,
    } = admission;

    tracing::info!(video_id = %id, attempt, quality = %quality, "Starting download");

    let request = StartRequest {
        video_id: id.clone(),
        title,
        quality,
    };

    let locator = match client.start(&request).await {
        Ok(locator) => locator,
        Err(e) => {
            tracing::warn!(video_id = %id, attempt, error = %e, "Executor did not accept download");
            store.dispatch(Intent::MarkError {
                id,
                attempt,
                message: e.to_string(),
            });
            return;
        }
    };

    if trust {
        tracing::info!(video_id = %id, filename = %locator.filename, "Download acknowledged, marking ready");
        store.dispatch(Intent::MarkReady {
            id,
            attempt,
            locator,
        });
        return;
    }

    let accepted = store.dispatch(Intent::MarkInProgress {
        id: id.clone(),
        attempt,
        locator: locator.clone(),
    });
    if let Outcome::NoOp(reason) = accepted {
        tracing::debug!(video_id = %id, attempt, ?reason, "Task changed while start was in flight, not tracking it");
        return;
    }

    let waited = client
        .wait_for_completion(&locator, |progress| {
            if !store.is_current(&id, attempt) {
                return false;
            }
            if let Some(percent) = progress {
                store.dispatch(Intent::ReportProgress {
                    id: id.clone(),
                    attempt,
                    percent,
                });
            }
            true
        })
        .await;

    match waited {
        Ok(Waited::Completed) => {
            tracing::info!(video_id = %id, filename = %locator.filename, "Download ready");
            store.dispatch(Intent::MarkReady {
                id,
                attempt,
                locator,
            });
        }
        Ok(Waited::Abandoned) => {
            tracing::debug!(video_id = %id, attempt, "Stopped tracking download");
        }
        Err(e) => {
            tracing::warn!(video_id = %id, attempt, error = %e, "Download failed");
            store.dispatch(Intent::MarkError {
                id,
                attempt,
                message: e.to_string(),
            });
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
