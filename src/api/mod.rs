//! REST API server module
//!
//! Provides an OpenAPI documented REST API for browsing the channel catalog,
//! managing the download queue and running downloads on this machine.

use crate::{Config, Result, TubeDownloader};
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// Everything except file downloads is mounted under `/api/v1`.
///
/// # Routes
///
/// ## Queue
/// - `GET /queue` - Queue snapshot
/// - `POST /queue` - Enqueue a selection
/// - `GET /queue/stats` - Queue statistics
/// - `POST /queue/clear-finished` - Remove ready and failed tasks
/// - `POST /queue/:id/pause` - Pause a task
/// - `POST /queue/:id/resume` - Resume a paused task
/// - `POST /queue/:id/retry` - Retry a failed task
/// - `DELETE /queue/:id` - Remove a task
///
/// ## Executor
/// - `POST /start-download` - Launch a download on this server
/// - `GET /download-status/:filename` - State of a launched download
/// - `POST /zip-downloads` - Bundle finished files into a ZIP
/// - `GET /downloads/videos/:filename` - Fetch a finished file (outside `/api/v1`)
///
/// ## Catalog
/// - `GET /videos` - One page of videos
/// - `GET /channel` - Channel and its playlists
///
/// ## Configuration
/// - `GET /config` - Get current config (API key redacted)
/// - `PATCH /config` - Update runtime settings
///
/// ## System
/// - `GET /capabilities` - Query system capabilities
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /shutdown` - Graceful shutdown
pub fn create_router(downloader: Arc<TubeDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let api = Router::new()
        // Queue
        .route("/queue", get(routes::get_queue))
        .route("/queue", post(routes::enqueue_selection))
        .route("/queue/stats", get(routes::queue_stats))
        .route("/queue/clear-finished", post(routes::clear_finished))
        .route("/queue/:id/pause", post(routes::pause_task))
        .route("/queue/:id/resume", post(routes::resume_task))
        .route("/queue/:id/retry", post(routes::retry_task))
        .route("/queue/:id", delete(routes::remove_task))
        // Executor
        .route("/start-download", post(routes::start_download))
        .route("/download-status/:filename", get(routes::download_status))
        .route("/zip-downloads", post(routes::zip_downloads))
        // Catalog
        .route("/videos", get(routes::list_videos))
        .route("/channel", get(routes::get_channel))
        // Configuration
        .route("/config", get(routes::get_config).patch(routes::update_config))
        // System
        .route("/capabilities", get(routes::get_capabilities))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/shutdown", post(routes::shutdown));

    let files_route = format!("{}/:filename", config.download.public_path.trim_end_matches('/'));
    let router = Router::new()
        .nest("/api/v1", api)
        .route(&files_route, get(routes::serve_file));

    // Swagger UI serves its own copy of the document; /api/v1/openapi.json stays with the API
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops, either due to an error or process exit.
///
/// # Example
///
/// ```no_run
/// use offlinetube::{TubeDownloader, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(TubeDownloader::new((*config).clone()).await?);
/// downloader.start_scheduler();
///
/// // Start API server (blocks until shutdown)
/// offlinetube::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(downloader: Arc<TubeDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
