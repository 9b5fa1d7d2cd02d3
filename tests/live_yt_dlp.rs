//! Downloads through a real yt-dlp binary
//!
//! These tests need yt-dlp on PATH and network access, so they are behind the
//! `live-tests` feature and marked #[ignore].
//!
//! ```bash
//! OFFLINETUBE_LIVE_VIDEO_ID=jNQXAC9IVRw \
//!     cargo test --features live-tests --test live_yt_dlp -- --ignored --nocapture
//! ```

#![cfg(feature = "live-tests")]

use offlinetube::{Config, TaskStatus, TubeDownloader, VideoId, VideoRef};
use std::time::Duration;

fn live_video_id() -> Option<String> {
    std::env::var("OFFLINETUBE_LIVE_VIDEO_ID").ok()
}

#[tokio::test]
#[ignore]
async fn test_live_download_reaches_ready() {
    let Some(id) = live_video_id() else {
        eprintln!("OFFLINETUBE_LIVE_VIDEO_ID not set, skipping");
        return;
    };

    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().to_path_buf();
    config.executor.poll_interval = Duration::from_millis(500);

    let downloader = TubeDownloader::new(config).await.unwrap();
    assert!(
        downloader.capabilities().can_download,
        "yt-dlp must be on PATH"
    );
    downloader.start_scheduler();

    downloader
        .enqueue(vec![VideoRef {
            id: VideoId::from(id.as_str()),
            title: "live test".into(),
            thumbnail_url: String::new(),
            quality: "360p".into(),
        }])
        .await
        .unwrap();

    let mut rx = downloader.watch_queue();
    let snapshot = tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            let status = snapshot.tasks[0].status;
            if matches!(status, TaskStatus::Ready | TaskStatus::Error) {
                return snapshot;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("live download did not settle");

    let task = &snapshot.tasks[0];
    assert_eq!(task.status, TaskStatus::Ready, "{:?}", task.error_message);

    let filename = &task.download_locator.as_ref().unwrap().filename;
    let metadata = std::fs::metadata(temp_dir.path().join(filename)).unwrap();
    assert!(metadata.len() > 0);

    downloader.shutdown().await.unwrap();
}
