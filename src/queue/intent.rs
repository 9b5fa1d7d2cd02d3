//! The closed set of queue intents and their outcomes

use crate::types::{DownloadLocator, TaskStatus, VideoId, VideoRef};

/// A requested change to the queue
///
/// User intents (`Enqueue`, `Pause`, `Resume`, `Retry`, `Remove`, `ClearFinished`,
/// `SetBudget`) come from the API or the embedding application. The rest are
/// dispatched by the scheduler and carry the admission `attempt` they belong to,
/// so results of an earlier attempt are recognised and dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    /// Append videos that are not yet in the queue
    Enqueue(Vec<VideoRef>),
    /// Admit a task: `queued`, `error` or `paused` -> `starting`
    MarkStarting(VideoId),
    /// Executor acknowledged the request: `starting` -> `in_progress`
    MarkInProgress {
        /// Task id
        id: VideoId,
        /// Attempt the acknowledgement belongs to
        attempt: u32,
        /// Where the file will be once complete
        locator: DownloadLocator,
    },
    /// Presentational progress for an `in_progress` task
    ReportProgress {
        /// Task id
        id: VideoId,
        /// Attempt the report belongs to
        attempt: u32,
        /// Percentage, clamped to 0..=99
        percent: u8,
    },
    /// File is complete: `starting`/`in_progress` -> `ready`
    MarkReady {
        /// Task id
        id: VideoId,
        /// Attempt the result belongs to
        attempt: u32,
        /// Where the finished file can be fetched
        locator: DownloadLocator,
    },
    /// Download failed: `starting`/`in_progress` -> `error`
    MarkError {
        /// Task id
        id: VideoId,
        /// Attempt the result belongs to
        attempt: u32,
        /// Reason shown to the user
        message: String,
    },
    /// Hold a task back from scheduling
    Pause(VideoId),
    /// Return a paused or failed task to `queued`
    Resume(VideoId),
    /// Return a paused or failed task to `queued`
    Retry(VideoId),
    /// Drop a task regardless of status
    Remove(VideoId),
    /// Drop every `ready` and `error` task
    ClearFinished,
    /// Replace the concurrency budget
    SetBudget(usize),
}

impl Intent {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Enqueue(_) => "enqueue",
            Intent::MarkStarting(_) => "start",
            Intent::MarkInProgress { .. } => "accept",
            Intent::ReportProgress { .. } => "report progress for",
            Intent::MarkReady { .. } => "complete",
            Intent::MarkError { .. } => "fail",
            Intent::Pause(_) => "pause",
            Intent::Resume(_) => "resume",
            Intent::Retry(_) => "retry",
            Intent::Remove(_) => "remove",
            Intent::ClearFinished => "clear finished",
            Intent::SetBudget(_) => "set budget",
        }
    }
}

/// What applying an intent did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The targeted task changed
    Applied,
    /// Result of an enqueue
    Enqueued {
        /// Tasks created
        added: usize,
        /// Videos skipped because they were already queued
        skipped: usize,
    },
    /// Tasks were deleted
    Removed {
        /// Number of tasks deleted
        count: usize,
    },
    /// Nothing changed
    NoOp(NoOpReason),
}

/// Why an intent left the queue untouched
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoOpReason {
    /// No task with this id
    UnknownTask,
    /// The intent is not defined for the task's current status
    InvalidTransition {
        /// Status the task was in
        from: TaskStatus,
    },
    /// Result for an attempt that is no longer current
    StaleAttempt,
    /// Task already in the requested state
    Unchanged,
}
