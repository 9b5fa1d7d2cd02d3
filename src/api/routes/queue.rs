//! Queue handlers: snapshot, enqueue and per-task intents.

use super::{ClearFinishedResponse, QueueResponse};
use crate::api::AppState;
use crate::error::Result;
use crate::selection::Selection;
use crate::types::{QueueStats, VideoId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /queue - Current queue snapshot
#[utoipa::path(
    get,
    path = "/api/v1/queue",
    tag = "queue",
    responses(
        (status = 200, description = "Tasks in insertion order", body = QueueResponse)
    )
)]
pub async fn get_queue(State(state): State<AppState>) -> Json<QueueResponse> {
    let snapshot = state.downloader.queue_snapshot();
    Json(QueueResponse {
        tasks: snapshot.tasks.clone(),
        budget: snapshot.budget,
        overall_progress: snapshot.overall_progress(),
        accepting_new: state.downloader.is_accepting(),
    })
}

/// POST /queue - Enqueue a selection
#[utoipa::path(
    post,
    path = "/api/v1/queue",
    tag = "queue",
    request_body = Selection,
    responses(
        (status = 201, description = "Selection added", body = EnqueueResult),
        (status = 503, description = "Shutting down")
    )
)]
pub async fn enqueue_selection(
    State(state): State<AppState>,
    Json(selection): Json<Selection>,
) -> Result<impl IntoResponse> {
    let result = state.downloader.enqueue_selection(&selection).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /queue/stats - Get queue statistics
#[utoipa::path(
    get,
    path = "/api/v1/queue/stats",
    tag = "queue",
    responses(
        (status = 200, description = "Queue statistics", body = QueueStats)
    )
)]
pub async fn queue_stats(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.downloader.stats())
}

/// POST /queue/clear-finished - Remove ready and failed tasks
#[utoipa::path(
    post,
    path = "/api/v1/queue/clear-finished",
    tag = "queue",
    responses(
        (status = 200, description = "Number of tasks removed", body = ClearFinishedResponse)
    )
)]
pub async fn clear_finished(State(state): State<AppState>) -> Result<Json<ClearFinishedResponse>> {
    let removed = state.downloader.clear_finished().await?;
    Ok(Json(ClearFinishedResponse { removed }))
}

/// POST /queue/:id/pause - Pause a task
#[utoipa::path(
    post,
    path = "/api/v1/queue/{id}/pause",
    tag = "queue",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Task paused"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task cannot be paused in its current state")
    )
)]
pub async fn pause_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.downloader.pause(&VideoId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /queue/:id/resume - Resume a paused task
#[utoipa::path(
    post,
    path = "/api/v1/queue/{id}/resume",
    tag = "queue",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Task queued again"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task cannot be resumed in its current state")
    )
)]
pub async fn resume_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.downloader.resume(&VideoId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /queue/:id/retry - Retry a failed task
#[utoipa::path(
    post,
    path = "/api/v1/queue/{id}/retry",
    tag = "queue",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Task queued again"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task cannot be retried in its current state")
    )
)]
pub async fn retry_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.downloader.retry(&VideoId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /queue/:id - Remove a task
#[utoipa::path(
    delete,
    path = "/api/v1/queue/{id}",
    tag = "queue",
    params(("id" = String, Path, description = "Video ID")),
    responses(
        (status = 204, description = "Task removed"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn remove_task(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.downloader.remove(&VideoId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
