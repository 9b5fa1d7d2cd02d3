//! Core types for offlinetube

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a source video, also used as the identity of its queue task
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Create a new VideoId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for VideoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for VideoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VideoId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Requested download quality such as `720p` or `audio_only`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Quality(pub String);

impl Quality {
    /// Quality label that requests the best audio-only stream
    pub const AUDIO_ONLY: &'static str = "audio_only";

    /// Create a new Quality from a label
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The label as given by the user
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this quality asks for audio only
    pub fn is_audio_only(&self) -> bool {
        self.0 == Self::AUDIO_ONLY
    }

    /// Vertical resolution encoded in the label (`"720p"` -> 720)
    pub fn height(&self) -> Option<u32> {
        self.0.strip_suffix('p').unwrap_or(&self.0).parse().ok()
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self("480p".to_string())
    }
}

impl From<&str> for Quality {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a queue task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for a free concurrency slot
    Queued,
    /// Admitted by the scheduler, executor request in flight
    Starting,
    /// Executor accepted the request, file not complete yet
    InProgress,
    /// File is complete and can be fetched
    Ready,
    /// Executor rejected or failed the download
    Error,
    /// Held back by the user
    Paused,
}

impl TaskStatus {
    /// Whether the task occupies a concurrency slot
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::Starting | TaskStatus::InProgress)
    }

    /// Whether the task is removed by `clear_finished`
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Ready | TaskStatus::Error)
    }

    /// Stable lowercase name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Starting => "starting",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Ready => "ready",
            TaskStatus::Error => "error",
            TaskStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a finished file can be fetched from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadLocator {
    /// URL path serving the file (e.g. `/downloads/videos/clip_720p_abc.mp4`)
    pub url: String,
    /// Bare filename, usable for archive bundling
    pub filename: String,
}

/// A download task tracked by the queue
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Task {
    /// Video identifier, unique within the queue
    pub id: VideoId,
    /// Video title captured at enqueue time
    pub title: String,
    /// Thumbnail URL captured at enqueue time
    pub thumbnail_url: String,
    /// Quality frozen at enqueue time
    pub selected_quality: Quality,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Presentational progress, 0 to 100
    pub progress: u8,
    /// Set only while the task is `ready`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_locator: Option<DownloadLocator>,
    /// Set only while the task is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of times the scheduler has admitted this task
    pub attempt: u32,
    /// Locator acknowledged by the executor for the running attempt
    #[serde(skip)]
    pub(crate) pending_locator: Option<DownloadLocator>,
}

impl Task {
    /// Build a fresh `queued` task from a resolved selection
    pub fn from_ref(video: VideoRef) -> Self {
        Self {
            id: video.id,
            title: video.title,
            thumbnail_url: video.thumbnail_url,
            selected_quality: video.quality,
            status: TaskStatus::Queued,
            progress: 0,
            download_locator: None,
            error_message: None,
            attempt: 0,
            pending_locator: None,
        }
    }

    /// Progress used for the overall average (`ready` counts as complete)
    pub fn effective_progress(&self) -> u8 {
        match self.status {
            TaskStatus::Ready => 100,
            _ => self.progress,
        }
    }
}

/// A video resolved for enqueueing, carrying the quality it will be fetched at
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VideoRef {
    /// Video identifier
    pub id: VideoId,
    /// Video title
    pub title: String,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: String,
    /// Resolved quality
    pub quality: Quality,
}

/// A catalog record for one video
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Video {
    /// Video identifier
    pub id: VideoId,
    /// Video title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail_url: String,
    /// Human readable duration (`12:34`, `LIVE`, `Upcoming`)
    pub duration_label: String,
    /// Relative upload date (`3 days ago`)
    pub upload_date_label: String,
    /// Human readable view count (`1.2M views`)
    pub view_count_label: String,
    /// Channel title
    pub channel_name: String,
    /// Qualities the user can choose from
    pub available_qualities: Vec<Quality>,
    /// Playlist the record was listed from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    /// Raw publication timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// One page of catalog results
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoPage {
    /// Videos on this page
    pub videos: Vec<Video>,
    /// Cursor of the next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Cursor of the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_cursor: Option<String>,
    /// Total number of results reported by the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    /// Page size reported by the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// A resolved channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChannelInfo {
    /// Channel identifier (`UC...`)
    pub id: String,
    /// Channel title
    pub title: String,
    /// Playlist holding every upload of the channel
    pub uploads_playlist_id: String,
}

/// A playlist published by a channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Playlist {
    /// Playlist identifier
    pub id: String,
    /// Playlist title
    pub title: String,
    /// Thumbnail URL
    pub thumbnail_url: String,
    /// Number of videos in the playlist
    pub item_count: u32,
}

/// Immutable view of the queue, replaced wholesale on every accepted change
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueSnapshot {
    /// Tasks in insertion order
    pub tasks: Vec<Task>,
    /// Maximum number of tasks allowed in `starting` or `in_progress`
    pub budget: usize,
}

impl QueueSnapshot {
    /// Look up a task by id
    pub fn get(&self, id: &VideoId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Number of tasks occupying a concurrency slot
    pub fn in_flight(&self) -> usize {
        self.tasks.iter().filter(|t| t.status.is_in_flight()).count()
    }

    /// Average effective progress across all tasks, 0 for an empty queue
    pub fn overall_progress(&self) -> f32 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let sum: u32 = self
            .tasks
            .iter()
            .map(|t| u32::from(t.effective_progress()))
            .sum();
        sum as f32 / self.tasks.len() as f32
    }

    /// Per-status counts and derived progress
    pub fn stats(&self) -> QueueStats {
        let count = |status: TaskStatus| self.tasks.iter().filter(|t| t.status == status).count();
        QueueStats {
            total: self.tasks.len(),
            queued: count(TaskStatus::Queued),
            starting: count(TaskStatus::Starting),
            in_progress: count(TaskStatus::InProgress),
            ready: count(TaskStatus::Ready),
            error: count(TaskStatus::Error),
            paused: count(TaskStatus::Paused),
            budget: self.budget,
            overall_progress: self.overall_progress(),
        }
    }
}

/// Queue statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QueueStats {
    /// Total number of tasks
    pub total: usize,
    /// Tasks waiting for a slot
    pub queued: usize,
    /// Tasks admitted but not yet acknowledged
    pub starting: usize,
    /// Tasks acknowledged and running on the executor
    pub in_progress: usize,
    /// Finished tasks
    pub ready: usize,
    /// Failed tasks
    pub error: usize,
    /// Paused tasks
    pub paused: usize,
    /// Current concurrency budget
    pub budget: usize,
    /// Overall queue progress (0.0 to 100.0)
    pub overall_progress: f32,
}

/// Result of adding videos to the queue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnqueueResult {
    /// Tasks created
    pub added: usize,
    /// Videos skipped because they were already queued
    pub skipped: usize,
}

/// What this instance is able to do, based on configuration and installed tools
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Executor the scheduler drives (`local` or `http`)
    pub executor: String,
    /// Fetcher used by the local media backend (`yt-dlp` or `unavailable`)
    pub fetcher: String,
    /// Whether `start-download` can launch downloads here
    pub can_download: bool,
    /// Whether a video catalog API key is configured
    pub catalog: bool,
    /// Whether tasks become ready on acknowledgement without a completion check
    pub trust_acknowledgement: bool,
}

/// State of a job on the server-side executor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    /// The external process is still running
    Running {
        /// Last reported progress, 0 to 100
        progress: u8,
    },
    /// The file is complete on disk
    Completed,
    /// The external process failed
    Failed {
        /// Failure reason
        message: String,
    },
}

/// Event emitted during the queue lifecycle
///
/// Consumers subscribe via [`TubeDownloader::subscribe`](crate::TubeDownloader::subscribe).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task added to the queue
    Queued {
        /// Video ID
        id: VideoId,
        /// Video title
        title: String,
        /// Quality the task will be fetched at
        quality: Quality,
    },

    /// Task removed from the queue
    Removed {
        /// Video ID
        id: VideoId,
    },

    /// Task admitted by the scheduler
    Starting {
        /// Video ID
        id: VideoId,
        /// Admission attempt number
        attempt: u32,
    },

    /// Executor acknowledged the request
    Accepted {
        /// Video ID
        id: VideoId,
        /// Filename the executor is writing
        filename: String,
    },

    /// Progress reported by the executor
    Progress {
        /// Video ID
        id: VideoId,
        /// Progress percentage (0 to 99)
        percent: u8,
    },

    /// File is complete and can be fetched
    Ready {
        /// Video ID
        id: VideoId,
        /// Where the file can be fetched
        locator: DownloadLocator,
    },

    /// Download failed
    Failed {
        /// Video ID
        id: VideoId,
        /// Error message
        error: String,
    },

    /// Task paused by the user
    Paused {
        /// Video ID
        id: VideoId,
    },

    /// Task returned to `queued` by retry or resume
    Requeued {
        /// Video ID
        id: VideoId,
    },

    /// Finished tasks cleared from the queue
    Cleared {
        /// Number of tasks removed
        count: usize,
    },

    /// Concurrency budget changed
    BudgetChanged {
        /// New budget
        budget: usize,
    },

    /// Downloader is shutting down
    Shutdown,
}

impl Event {
    /// Name used for the SSE `event:` field
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Queued { .. } => "queued",
            Event::Removed { .. } => "removed",
            Event::Starting { .. } => "starting",
            Event::Accepted { .. } => "accepted",
            Event::Progress { .. } => "progress",
            Event::Ready { .. } => "ready",
            Event::Failed { .. } => "failed",
            Event::Paused { .. } => "paused",
            Event::Requeued { .. } => "requeued",
            Event::Cleared { .. } => "cleared",
            Event::BudgetChanged { .. } => "budget_changed",
            Event::Shutdown => "shutdown",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, status: TaskStatus, progress: u8) -> Task {
        let mut t = Task::from_ref(VideoRef {
            id: VideoId::from(id),
            title: format!("title {id}"),
            thumbnail_url: String::new(),
            quality: Quality::from("720p"),
        });
        t.status = status;
        t.progress = progress;
        t
    }

    #[test]
    fn quality_height_parses_resolution_labels() {
        assert_eq!(Quality::from("1080p").height(), Some(1080));
        assert_eq!(Quality::from("360").height(), Some(360));
        assert_eq!(Quality::from("audio_only").height(), None);
        assert!(Quality::from("audio_only").is_audio_only());
        assert_eq!(Quality::default().as_str(), "480p");
    }

    #[test]
    fn task_status_serializes_as_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: TaskStatus = serde_json::from_str("\"ready\"").unwrap();
        assert_eq!(parsed, TaskStatus::Ready);
    }

    #[test]
    fn in_flight_covers_starting_and_in_progress_only() {
        let in_flight: Vec<_> = [
            TaskStatus::Queued,
            TaskStatus::Starting,
            TaskStatus::InProgress,
            TaskStatus::Ready,
            TaskStatus::Error,
            TaskStatus::Paused,
        ]
        .into_iter()
        .filter(|s| s.is_in_flight())
        .collect();
        assert_eq!(in_flight, vec![TaskStatus::Starting, TaskStatus::InProgress]);
    }

    #[test]
    fn overall_progress_counts_ready_as_complete() {
        let mut ready = task("a", TaskStatus::Ready, 0);
        ready.progress = 0;
        let snapshot = QueueSnapshot {
            tasks: vec![ready, task("b", TaskStatus::Queued, 0)],
            budget: 2,
        };
        assert!(
            (snapshot.overall_progress() - 50.0).abs() < f32::EPSILON,
            "ready task should count as 100, got {}",
            snapshot.overall_progress()
        );
    }

    #[test]
    fn overall_progress_of_empty_queue_is_zero() {
        assert_eq!(QueueSnapshot::default().overall_progress(), 0.0);
    }

    #[test]
    fn stats_counts_each_status() {
        let snapshot = QueueSnapshot {
            tasks: vec![
                task("a", TaskStatus::Ready, 100),
                task("b", TaskStatus::Error, 0),
                task("c", TaskStatus::Queued, 0),
                task("d", TaskStatus::Starting, 0),
                task("e", TaskStatus::InProgress, 40),
            ],
            budget: 2,
        };
        let stats = snapshot.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.error, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.starting, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(snapshot.in_flight(), 2);
    }

    #[test]
    fn pending_locator_is_not_serialized() {
        let mut t = task("a", TaskStatus::InProgress, 10);
        t.pending_locator = Some(DownloadLocator {
            url: "/downloads/videos/a.mp4".into(),
            filename: "a.mp4".into(),
        });
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("pending_locator").is_none());
        assert!(
            json.get("download_locator").is_none(),
            "locator must only be exposed once ready"
        );
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::Failed {
            id: VideoId::from("v4"),
            error: "yt-dlp exited with code 1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["id"], "v4");
        assert_eq!(event.kind(), "failed");
    }
}
