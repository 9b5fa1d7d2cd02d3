//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the offlinetube REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the offlinetube REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "offlinetube REST API",
        version = "0.1.0",
        description = "Browse a YouTube channel, queue videos for download under a concurrency budget, and fetch the finished files",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6789", description = "Local development server")
    ),
    paths(
        // Queue
        crate::api::routes::get_queue,
        crate::api::routes::enqueue_selection,
        crate::api::routes::queue_stats,
        crate::api::routes::clear_finished,
        crate::api::routes::pause_task,
        crate::api::routes::resume_task,
        crate::api::routes::retry_task,
        crate::api::routes::remove_task,

        // Executor
        crate::api::routes::start_download,
        crate::api::routes::download_status,
        crate::api::routes::serve_file,
        crate::api::routes::zip_downloads,

        // Catalog
        crate::api::routes::list_videos,
        crate::api::routes::get_channel,

        // Configuration
        crate::api::routes::get_config,
        crate::api::routes::update_config,

        // System
        crate::api::routes::get_capabilities,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::VideoId,
        crate::types::Quality,
        crate::types::TaskStatus,
        crate::types::DownloadLocator,
        crate::types::Task,
        crate::types::VideoRef,
        crate::types::Video,
        crate::types::VideoPage,
        crate::types::ChannelInfo,
        crate::types::Playlist,
        crate::types::QueueStats,
        crate::types::EnqueueResult,
        crate::types::Capabilities,
        crate::types::JobState,
        crate::types::Event,

        // Selections
        crate::selection::Selection,
        crate::selection::CatalogEntry,

        // Executor wire bodies
        crate::executor::protocol::StartDownloadBody,
        crate::executor::protocol::StartDownloadResponse,
        crate::executor::protocol::ZipDownloadsBody,

        // Config types from config.rs
        crate::config::Config,
        crate::config::ConfigUpdate,
        crate::config::DownloadConfig,
        crate::config::ToolsConfig,
        crate::config::ExecutorMode,
        crate::config::ExecutorConfig,
        crate::config::CatalogConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::QueueResponse,
        crate::api::routes::ClearFinishedResponse,
        crate::api::routes::VideosQuery,
        crate::api::routes::ChannelQuery,
        crate::downloader::ChannelOverview,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "queue", description = "Download queue - Enqueue selections, pause, resume, retry and remove tasks"),
        (name = "executor", description = "Server-side downloads - Start yt-dlp, poll status, fetch files and ZIP archives"),
        (name = "catalog", description = "Channel catalog - Resolve channels and page through their videos"),
        (name = "config", description = "Configuration - Get and update runtime configuration settings"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
