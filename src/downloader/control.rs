//! Queue control: enqueue, pause, resume, retry, remove, clear finished.

use crate::error::{Error, Result, TaskError};
use crate::queue::{Intent, NoOpReason, Outcome};
use crate::selection::Selection;
use crate::types::{EnqueueResult, VideoId, VideoRef};
use std::sync::atomic::Ordering;

use super::TubeDownloader;

impl TubeDownloader {
    /// Add videos to the end of the queue
    ///
    /// Videos already in the queue are skipped, whatever their status. New
    /// tasks start as `queued` and are admitted by the scheduler in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use offlinetube::{TubeDownloader, VideoRef};
    /// # async fn example(downloader: TubeDownloader) -> offlinetube::Result<()> {
    /// let result = downloader
    ///     .enqueue(vec![VideoRef {
    ///         id: "dQw4w9WgXcQ".into(),
    ///         title: "Never Gonna Give You Up".into(),
    ///         thumbnail_url: String::new(),
    ///         quality: "720p".into(),
    ///     }])
    ///     .await?;
    /// println!("added {}, skipped {}", result.added, result.skipped);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue(&self, videos: Vec<VideoRef>) -> Result<EnqueueResult> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let requested = videos.len();
        match self.queue_state.store.dispatch(Intent::Enqueue(videos)) {
            Outcome::Enqueued { added, skipped } => Ok(EnqueueResult { added, skipped }),
            _ => Ok(EnqueueResult {
                added: 0,
                skipped: requested,
            }),
        }
    }

    /// Resolve a selection against its catalog and enqueue the result
    ///
    /// Qualities fall back to the selection's global quality, then to the
    /// runtime default quality.
    pub async fn enqueue_selection(&self, selection: &Selection) -> Result<EnqueueResult> {
        let default_quality = self.runtime_config.default_quality.read().await.clone();
        let refs = selection.resolve(&default_quality);
        tracing::debug!(
            selected = selection.selected.len(),
            resolved = refs.len(),
            "Resolved selection"
        );
        self.enqueue(refs).await
    }

    /// Hold a task back from scheduling
    ///
    /// Pausing an in-flight task releases its slot, but the download already
    /// launched on the executor keeps running; its result is ignored. Pausing
    /// a paused task is a no-op.
    pub async fn pause(&self, id: &VideoId) -> Result<()> {
        self.apply(Intent::Pause(id.clone()), id)
    }

    /// Return a paused task to the back of the admission order
    pub async fn resume(&self, id: &VideoId) -> Result<()> {
        self.apply(Intent::Resume(id.clone()), id)
    }

    /// Re-queue a failed task, clearing its error
    pub async fn retry(&self, id: &VideoId) -> Result<()> {
        self.apply(Intent::Retry(id.clone()), id)
    }

    /// Drop a task from the queue, whatever its status
    ///
    /// A running download is not stopped; the file may still appear on disk.
    pub async fn remove(&self, id: &VideoId) -> Result<()> {
        self.apply(Intent::Remove(id.clone()), id)
    }

    /// Drop every `ready` and `error` task, returning how many were removed
    pub async fn clear_finished(&self) -> Result<usize> {
        match self.queue_state.store.dispatch(Intent::ClearFinished) {
            Outcome::Removed { count } => Ok(count),
            _ => Ok(0),
        }
    }

    fn apply(&self, intent: Intent, id: &VideoId) -> Result<()> {
        let operation = intent.name();
        match self.queue_state.store.dispatch(intent) {
            Outcome::NoOp(NoOpReason::UnknownTask) => Err(TaskError::NotFound {
                id: id.to_string(),
            }
            .into()),
            Outcome::NoOp(NoOpReason::InvalidTransition { from }) => Err(TaskError::InvalidState {
                id: id.to_string(),
                operation: operation.to_string(),
                current_state: from.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
