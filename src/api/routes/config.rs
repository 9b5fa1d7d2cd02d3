//! Configuration handlers.

use crate::api::AppState;
use crate::config::{Config, ConfigUpdate};
use axum::{Json, extract::State};

const REDACTED: &str = "***REDACTED***";

fn redact(mut config: Config) -> Config {
    if config.catalog.api_key.is_some() {
        config.catalog.api_key = Some(REDACTED.to_string());
    }
    config
}

/// GET /config - Get current config (API key redacted)
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Current configuration", body = Config)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> Json<Config> {
    Json(redact(state.downloader.current_config().await))
}

/// PATCH /config - Update config
#[utoipa::path(
    patch,
    path = "/api/v1/config",
    tag = "config",
    request_body(content = ConfigUpdate, description = "Configuration updates (runtime-changeable fields only)"),
    responses(
        (status = 200, description = "Configuration updated", body = Config),
        (status = 400, description = "Invalid configuration")
    )
)]
pub async fn update_config(
    State(state): State<AppState>,
    Json(updates): Json<ConfigUpdate>,
) -> crate::Result<Json<Config>> {
    let config = state.downloader.update_config(updates).await?;
    Ok(Json(redact(config)))
}
