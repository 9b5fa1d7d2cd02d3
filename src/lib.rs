//! # offlinetube
//!
//! Channel browsing and download-queue orchestration for building offline
//! YouTube archives.
//!
//! ## Overview
//!
//! A user browses a channel's videos, selects some at a chosen quality and
//! adds them to a queue. The queue admits tasks into a bounded number of
//! download slots in FIFO order and drives each one through a download
//! executor, either `yt-dlp` running in this process or a remote offlinetube
//! instance reached over HTTP. Finished files can be fetched one by one or
//! bundled into a ZIP archive.
//!
//! - **Intent-driven queue** - Every change goes through a single reducer and
//!   is published as an immutable snapshot
//! - **Bounded concurrency** - At most `max_concurrent_downloads` tasks talk
//!   to the executor at once
//! - **Honest completion** - An executor acknowledgement is not a finished
//!   file; tasks become ready once the executor reports completion
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use offlinetube::{Config, TubeDownloader, VideoRef};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = TubeDownloader::new(Config::default()).await?;
//!     downloader.start_scheduler();
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader
//!         .enqueue(vec![VideoRef {
//!             id: "dQw4w9WgXcQ".into(),
//!             title: "Some video".to_string(),
//!             thumbnail_url: String::new(),
//!             quality: "720p".into(),
//!         }])
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Server-side media backend (yt-dlp runs, job tracking, ZIP bundling)
pub mod backend;
/// Video catalog client
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Download executor contract and clients
pub mod executor;
/// Queue state store
pub mod queue;
/// Admission loop driving queued tasks through the executor
pub mod scheduler;
/// Task construction from a user selection
pub mod selection;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigUpdate, ExecutorMode};
pub use downloader::{ChannelOverview, TubeDownloader};
pub use error::{
    ApiError, ArchiveError, CatalogError, Error, ErrorDetail, ExecutorError, Result, TaskError,
    ToHttpStatus,
};
pub use executor::{CompletionState, DownloadExecutor, HttpExecutor, StartRequest};
pub use queue::{Intent, QueueStore};
pub use selection::{CatalogEntry, Selection};
pub use types::{
    Capabilities, DownloadLocator, EnqueueResult, Event, JobState, Quality, QueueSnapshot,
    QueueStats, Task, TaskStatus, Video, VideoId, VideoPage, VideoRef,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use offlinetube::{TubeDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = TubeDownloader::new(Config::default()).await?;
///     downloader.start_scheduler();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: TubeDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
