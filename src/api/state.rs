//! Application state for the API server

use crate::{Config, TubeDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// The downloader owning the queue, the media backend and the catalog
    pub downloader: Arc<TubeDownloader>,

    /// Startup configuration; runtime updates go through the downloader
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<TubeDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
