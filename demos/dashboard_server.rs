//! Dashboard server example
//!
//! Runs offlinetube with the REST API enabled so a browser dashboard can list
//! a channel, queue videos and fetch the finished files.
//!
//! ```bash
//! YOUTUBE_API_KEY=... YOUTUBE_CHANNEL_URL=https://www.youtube.com/@somechannel \
//!     RUST_LOG=offlinetube=debug cargo run --example dashboard_server [config.json]
//! ```
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:6789/swagger-ui
//! - List videos via GET http://localhost:6789/api/v1/videos
//! - Queue a selection via POST http://localhost:6789/api/v1/queue
//! - Stream events via GET http://localhost:6789/api/v1/events

use offlinetube::{Config, TubeDownloader, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("offlinetube=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides()?;

    let downloader = Arc::new(TubeDownloader::new(config).await?);
    let capabilities = downloader.capabilities();
    if !capabilities.can_download {
        tracing::warn!("yt-dlp was not found; start-download requests will be refused");
    }
    if !capabilities.catalog {
        tracing::warn!("YOUTUBE_API_KEY is not set; /videos and /channel are unavailable");
    }

    downloader.start_scheduler();
    let api = downloader.spawn_api_server();

    let address = downloader.get_config().server.api.bind_address;
    println!("Swagger UI:    http://{address}/swagger-ui");
    println!("API base:      http://{address}/api/v1");
    println!("Events stream: http://{address}/api/v1/events");
    println!();
    println!("  # Queue two videos at 720p");
    println!("  curl -X POST http://{address}/api/v1/queue \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"selected\": [\"a\"], \"videos\": [{{\"id\": \"a\", \"title\": \"A\"}}], \"global_quality\": \"720p\"}}'"
    );

    run_with_shutdown((*downloader).clone()).await?;
    api.abort();

    Ok(())
}
