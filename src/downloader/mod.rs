//! Core downloader implementation split into focused submodules.
//!
//! The `TubeDownloader` struct and its methods are organized by domain:
//! - [`control`] - Queue intents (enqueue, pause, resume, retry, remove, clear)
//! - [`config_ops`] - Runtime configuration updates
//! - [`browse`] - Channel and video listings from the catalog
//! - [`lifecycle`] - Scheduler startup and shutdown coordination

mod browse;
mod config_ops;
mod control;
mod lifecycle;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use browse::ChannelOverview;

use crate::backend::{MediaBackend, MediaFetcher, UnavailableFetcher, YtDlp};
use crate::catalog::{VideoCatalog, YouTubeCatalog};
use crate::config::{Config, ExecutorMode};
use crate::error::{Error, Result};
use crate::executor::{DownloadExecutor, ExecutorClient, HttpExecutor};
use crate::queue::QueueStore;
use crate::scheduler::Scheduler;
use crate::types::{Capabilities, Event, QueueSnapshot, QueueStats, Quality};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Queue and scheduling state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Authoritative queue owner
    pub(crate) store: Arc<QueueStore>,
    /// Admission loop and job tracker
    pub(crate) scheduler: Scheduler,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancels the scheduler loop and the jobs watching the executor
    pub(crate) cancel: CancellationToken,
}

/// Runtime-mutable configuration (separate from static config)
#[derive(Clone)]
pub(crate) struct RuntimeConfig {
    /// Quality used when a selection names none
    pub(crate) default_quality: Arc<tokio::sync::RwLock<Quality>>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TubeDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Queue and scheduling state
    pub(crate) queue_state: QueueState,
    /// Runtime-mutable configuration
    pub(crate) runtime_config: RuntimeConfig,
    /// Server-side media backend behind the start-download and file endpoints
    pub(crate) backend: Arc<MediaBackend>,
    /// Name of the executor the scheduler drives
    pub(crate) executor_name: &'static str,
    /// Channel and video listings, if an API key is configured
    pub(crate) catalog: Option<Arc<dyn VideoCatalog>>,
}

/// Pick the fetcher for the local media backend
///
/// An explicitly configured binary wins; otherwise PATH is searched unless
/// disabled. Without a binary, `start-download` answers that yt-dlp is missing.
fn select_fetcher(config: &Config) -> Arc<dyn MediaFetcher> {
    let timeout = config.tools.process_timeout;
    let fetcher: Arc<dyn MediaFetcher> = if let Some(ref path) = config.tools.yt_dlp_path {
        Arc::new(YtDlp::new(path.clone(), timeout))
    } else if config.tools.search_path {
        YtDlp::from_path(timeout)
            .map(|f| Arc::new(f) as Arc<dyn MediaFetcher>)
            .unwrap_or_else(|| Arc::new(UnavailableFetcher))
    } else {
        Arc::new(UnavailableFetcher)
    };

    tracing::info!(
        fetcher = fetcher.name(),
        available = fetcher.is_available(),
        "Media fetcher initialized"
    );
    fetcher
}

impl TubeDownloader {
    /// Create a new TubeDownloader instance
    ///
    /// This validates the configuration, creates the download directory,
    /// looks for yt-dlp, picks the executor by `executor.mode` (the in-process
    /// media backend, or a remote API) and builds the catalog when an API key
    /// is set. The scheduler is not started; call [`start_scheduler`](Self::start_scheduler).
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = Self::build_backend(&config).await?;

        let executor: Arc<dyn DownloadExecutor> = match config.executor.mode {
            ExecutorMode::Local => backend.clone() as Arc<dyn DownloadExecutor>,
            ExecutorMode::Remote => Arc::new(HttpExecutor::new(config.executor.base_url.clone())?),
        };

        Self::assemble(config, backend, executor)
    }

    /// Create a TubeDownloader that drives a custom executor
    ///
    /// The media backend is still built from `config`, so the API keeps serving
    /// `start-download` and files.
    pub async fn with_executor(config: Config, executor: Arc<dyn DownloadExecutor>) -> Result<Self> {
        config.validate()?;
        let backend = Self::build_backend(&config).await?;
        Self::assemble(config, backend, executor)
    }

    async fn build_backend(config: &Config) -> Result<Arc<MediaBackend>> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        Ok(Arc::new(MediaBackend::new(
            config.download.download_dir.clone(),
            config.download.public_path.clone(),
            select_fetcher(config),
        )))
    }

    fn assemble(
        config: Config,
        backend: Arc<MediaBackend>,
        executor: Arc<dyn DownloadExecutor>,
    ) -> Result<Self> {
        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let has_key = config
            .catalog
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        let catalog: Option<Arc<dyn VideoCatalog>> = if has_key {
            Some(Arc::new(YouTubeCatalog::new(&config.catalog)?))
        } else {
            None
        };

        let store = Arc::new(QueueStore::new(
            config.download.max_concurrent_downloads,
            event_tx.clone(),
        ));
        let cancel = CancellationToken::new();
        let executor_name = executor.name();
        let client = ExecutorClient::new(executor, &config.executor);
        let scheduler = Scheduler::new(
            store.clone(),
            client,
            config.executor.trust_acknowledgement,
            cancel.clone(),
        );

        tracing::info!(
            executor = executor_name,
            budget = config.download.max_concurrent_downloads,
            trust_acknowledgement = config.executor.trust_acknowledgement,
            catalog = catalog.as_ref().map(|c| c.name()).unwrap_or("none"),
            "Downloader initialized"
        );

        let queue_state = QueueState {
            store,
            scheduler,
            accepting_new: Arc::new(AtomicBool::new(true)),
            cancel,
        };

        let runtime_config = RuntimeConfig {
            default_quality: Arc::new(tokio::sync::RwLock::new(
                config.download.default_quality.clone(),
            )),
        };

        Ok(Self {
            event_tx,
            config: Arc::new(config),
            queue_state,
            runtime_config,
            backend,
            executor_name,
            catalog,
        })
    }

    /// Subscribe to queue events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use offlinetube::{TubeDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = TubeDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "queue event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Receive every published queue snapshot
    pub fn watch_queue(&self) -> tokio::sync::watch::Receiver<Arc<QueueSnapshot>> {
        self.queue_state.store.subscribe()
    }

    /// Current queue snapshot
    pub fn queue_snapshot(&self) -> Arc<QueueSnapshot> {
        self.queue_state.store.snapshot()
    }

    /// Per-status counts and overall progress
    pub fn stats(&self) -> QueueStats {
        self.queue_state.store.stats()
    }

    /// Average progress across the queue, 0 when empty
    pub fn overall_progress(&self) -> f32 {
        self.queue_state.store.overall_progress()
    }

    /// Get the current configuration
    ///
    /// Returns the startup configuration. The configuration is wrapped in an Arc,
    /// so this is a cheap clone operation. Runtime changes made through
    /// [`update_config`](Self::update_config) are reflected by
    /// [`current_config`](Self::current_config) instead.
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The server-side media backend
    pub fn backend(&self) -> &Arc<MediaBackend> {
        &self.backend
    }

    /// Query what this instance can do
    pub fn capabilities(&self) -> Capabilities {
        let fetcher = self.backend.fetcher_name();
        Capabilities {
            executor: self.executor_name.to_string(),
            fetcher: fetcher.to_string(),
            can_download: fetcher != "unavailable",
            catalog: self.catalog.is_some(),
            trust_acknowledgement: self.config.executor.trust_acknowledgement,
        }
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:6789).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
