//! Shared test helpers for creating TubeDownloader instances in tests.

use crate::config::Config;
use crate::downloader::TubeDownloader;
use crate::error::ExecutorError;
use crate::executor::{CompletionState, DownloadExecutor, StartRequest};
use crate::types::{DownloadLocator, QueueSnapshot, Quality, VideoId, VideoRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::oneshot;

/// Where the scripted executor says a video's file goes
pub(crate) fn locator_for(id: &str) -> DownloadLocator {
    DownloadLocator {
        url: format!("/downloads/videos/{id}.mp4"),
        filename: format!("{id}.mp4"),
    }
}

pub(crate) fn video(id: &str) -> VideoRef {
    VideoRef {
        id: VideoId::from(id),
        title: format!("Video {id}"),
        thumbnail_url: format!("https://img.example/{id}.jpg"),
        quality: Quality::from("720p"),
    }
}

/// Executor driven step by step from the test
///
/// Each `start` blocks until the test calls [`accept`](Self::accept) or
/// [`reject`](Self::reject) for that video. Completion checks report whatever
/// was last set with [`complete`](Self::complete), [`fail`](Self::fail) or
/// [`progress`](Self::progress), and `pending` otherwise.
#[derive(Default)]
pub(crate) struct ScriptedExecutor {
    waiting: Mutex<HashMap<VideoId, oneshot::Sender<Result<(), ExecutorError>>>>,
    started: Mutex<Vec<StartRequest>>,
    states: Mutex<HashMap<String, CompletionState>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every start request received so far, in order
    pub(crate) fn started(&self) -> Vec<StartRequest> {
        self.started.lock().unwrap().clone()
    }

    /// Number of start requests currently blocked
    pub(crate) fn blocked(&self) -> usize {
        self.waiting.lock().unwrap().len()
    }

    /// Wait until a start request for `id` is blocked on the script
    pub(crate) async fn wait_for_start(&self, id: &str) {
        let id = VideoId::from(id);
        for _ in 0..500 {
            if self.waiting.lock().unwrap().contains_key(&id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("start for {id} never arrived");
    }

    fn release(&self, id: &str, result: Result<(), ExecutorError>) {
        let sender = self
            .waiting
            .lock()
            .unwrap()
            .remove(&VideoId::from(id))
            .unwrap_or_else(|| panic!("no start pending for {id}"));
        sender.send(result).unwrap();
    }

    /// Acknowledge the pending start for `id`
    pub(crate) async fn accept(&self, id: &str) {
        self.wait_for_start(id).await;
        self.release(id, Ok(()));
    }

    /// Refuse the pending start for `id`
    pub(crate) async fn reject(&self, id: &str, message: &str) {
        self.wait_for_start(id).await;
        self.release(
            id,
            Err(ExecutorError::Rejected {
                message: message.to_string(),
            }),
        );
    }

    fn set_state(&self, id: &str, state: CompletionState) {
        self.states
            .lock()
            .unwrap()
            .insert(locator_for(id).filename, state);
    }

    pub(crate) fn progress(&self, id: &str, percent: u8) {
        self.set_state(
            id,
            CompletionState::Pending {
                progress: Some(percent),
            },
        );
    }

    pub(crate) fn complete(&self, id: &str) {
        self.set_state(id, CompletionState::Completed);
    }

    pub(crate) fn fail(&self, id: &str, message: &str) {
        self.set_state(
            id,
            CompletionState::Failed {
                message: message.to_string(),
            },
        );
    }
}

#[async_trait]
impl DownloadExecutor for ScriptedExecutor {
    async fn start(&self, request: &StartRequest) -> Result<DownloadLocator, ExecutorError> {
        let (tx, rx) = oneshot::channel();
        self.started.lock().unwrap().push(request.clone());
        self.waiting
            .lock()
            .unwrap()
            .insert(request.video_id.clone(), tx);

        match rx.await {
            Ok(Ok(())) => Ok(locator_for(request.video_id.as_str())),
            Ok(Err(e)) => Err(e),
            Err(_) => std::future::pending().await,
        }
    }

    async fn completion(&self, locator: &DownloadLocator) -> Result<CompletionState, ExecutorError> {
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(&locator.filename)
            .cloned()
            .unwrap_or(CompletionState::Pending { progress: None }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config for tests: downloads in `dir`, no yt-dlp lookup, fast polling
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.max_concurrent_downloads = 2;
    config.tools.search_path = false;
    config.executor.request_timeout = Duration::from_secs(5);
    config.executor.poll_interval = Duration::from_millis(10);
    config.executor.completion_deadline = Duration::from_secs(30);
    config
}

/// Helper to create a test TubeDownloader driving a [`ScriptedExecutor`].
/// Returns the downloader, the executor and the tempdir (which must be kept alive).
/// The scheduler is not started.
pub(crate) async fn create_test_downloader()
-> (TubeDownloader, Arc<ScriptedExecutor>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let executor = ScriptedExecutor::new();
    let downloader = TubeDownloader::with_executor(test_config(temp_dir.path()), executor.clone())
        .await
        .unwrap();
    (downloader, executor, temp_dir)
}

/// Wait until the queue satisfies `predicate`, returning the matching snapshot
pub(crate) async fn wait_for_queue<F>(downloader: &TubeDownloader, predicate: F) -> Arc<QueueSnapshot>
where
    F: Fn(&QueueSnapshot) -> bool,
{
    let mut rx = downloader.watch_queue();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if predicate(&snapshot) {
                return snapshot;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("queue never reached the expected state")
}
