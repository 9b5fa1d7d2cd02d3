//! Catalog handlers: channel overview and video pages.

use super::{ChannelQuery, VideosQuery};
use crate::api::AppState;
use crate::downloader::ChannelOverview;
use crate::types::VideoPage;
use axum::{
    Json,
    extract::{Query, State},
};

/// GET /videos - One page of videos
#[utoipa::path(
    get,
    path = "/api/v1/videos",
    tag = "catalog",
    params(VideosQuery),
    responses(
        (status = 200, description = "Page of videos", body = VideoPage),
        (status = 400, description = "No channel configured"),
        (status = 502, description = "Catalog API error"),
        (status = 503, description = "Catalog not configured")
    )
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Query(query): Query<VideosQuery>,
) -> crate::Result<Json<VideoPage>> {
    let page = state
        .downloader
        .videos(query.playlist_id.as_deref(), query.cursor.as_deref())
        .await?;
    Ok(Json(page))
}

/// GET /channel - Resolve a channel and list its playlists
#[utoipa::path(
    get,
    path = "/api/v1/channel",
    tag = "catalog",
    params(ChannelQuery),
    responses(
        (status = 200, description = "Channel and playlists", body = ChannelOverview),
        (status = 400, description = "Invalid channel URL"),
        (status = 404, description = "Channel not found"),
        (status = 503, description = "Catalog not configured")
    )
)]
pub async fn get_channel(
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> crate::Result<Json<ChannelOverview>> {
    let overview = state.downloader.channel_overview(query.url.as_deref()).await?;
    Ok(Json(overview))
}
