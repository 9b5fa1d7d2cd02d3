//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`queue`] - Queue snapshot, enqueue and per-task intents
//! - [`executor`] - Start/status of server-side downloads, file fetch, ZIP bundling
//! - [`catalog`] - Channel and video listings
//! - [`config`] - Runtime configuration
//! - [`system`] - Health, capabilities, events, OpenAPI, shutdown

use serde::{Deserialize, Serialize};

mod catalog;
mod config;
mod executor;
mod queue;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use catalog::*;
pub use config::*;
pub use executor::*;
pub use queue::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /videos
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VideosQuery {
    /// Playlist to list (default: uploads of the configured channel)
    pub playlist_id: Option<String>,
    /// Page cursor returned by a previous call
    pub cursor: Option<String>,
}

/// Query parameters for GET /channel
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChannelQuery {
    /// Channel URL or reference (default: the configured channel)
    pub url: Option<String>,
}

/// Response for GET /queue
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QueueResponse {
    /// Tasks in insertion order
    pub tasks: Vec<crate::types::Task>,
    /// Current concurrency budget
    pub budget: usize,
    /// Overall queue progress (0.0 to 100.0)
    pub overall_progress: f32,
    /// Whether new tasks are accepted
    pub accepting_new: bool,
}

/// Response for POST /queue/clear-finished
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClearFinishedResponse {
    /// Number of tasks removed
    pub removed: usize,
}
