//! Server-side executor handlers: start a download, report its state, serve
//! the finished file and bundle several files into a ZIP.
//!
//! `start-download` and `zip-downloads` answer failures with
//! `{ "success": false, "message": ... }` rather than the structured
//! [`ApiError`](crate::error::ApiError) body, since remote executor clients
//! read the message verbatim.

use crate::api::AppState;
use crate::error::{Error, ToHttpStatus};
use crate::executor::protocol::{StartDownloadBody, StartDownloadResponse, ZipDownloadsBody};
use crate::types::JobState;
use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

fn failure_response(error: Error) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match error {
        Error::Validation(message) | Error::ExternalTool(message) => message,
        Error::Archive(e) => e.to_string(),
        other => other.to_string(),
    };
    (status, Json(StartDownloadResponse::failure(message))).into_response()
}

/// Malformed or non-JSON bodies get the same `{success, message}` shape as other failures
fn invalid_body(rejection: JsonRejection) -> Response {
    tracing::warn!(error = %rejection.body_text(), "Rejected malformed request body");
    failure_response(Error::Validation(format!(
        "Invalid request body: {}",
        rejection.body_text()
    )))
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "mp4" => "video/mp4",
        Some(ext) if ext == "m4a" => "audio/mp4",
        Some(ext) if ext == "webm" => "video/webm",
        Some(ext) if ext == "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

fn attachment(filename: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// POST /start-download - Launch a download on this server
#[utoipa::path(
    post,
    path = "/api/v1/start-download",
    tag = "executor",
    request_body = StartDownloadBody,
    responses(
        (status = 200, description = "Download launched", body = StartDownloadResponse),
        (status = 400, description = "Missing videoId, videoTitle or selectedQuality", body = StartDownloadResponse),
        (status = 500, description = "Download could not be launched", body = StartDownloadResponse),
        (status = 503, description = "yt-dlp is not available", body = StartDownloadResponse)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    payload: Result<Json<StartDownloadBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };
    match state.downloader.backend().start_download(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            tracing::warn!(video_id = %body.video_id, error = %e, "Rejected start-download request");
            failure_response(e)
        }
    }
}

/// GET /download-status/:filename - State of a server-side download
#[utoipa::path(
    get,
    path = "/api/v1/download-status/{filename}",
    tag = "executor",
    params(("filename" = String, Path, description = "Filename returned by start-download")),
    responses(
        (status = 200, description = "Download state", body = JobState),
        (status = 404, description = "Unknown download")
    )
)]
pub async fn download_status(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> crate::Result<Json<JobState>> {
    state
        .downloader
        .backend()
        .job_state(&filename)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("download {}", filename)))
}

/// GET /downloads/videos/:filename - Fetch a finished file
#[utoipa::path(
    get,
    path = "/downloads/videos/{filename}",
    tag = "executor",
    params(("filename" = String, Path, description = "Filename of a finished download")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "File not found or still downloading")
    )
)]
pub async fn serve_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> crate::Result<Response> {
    let path = state.downloader.backend().file_path(&filename).await?;
    let file = tokio::fs::File::open(&path).await?;
    let size = file.metadata().await?.len();

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&filename)));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, attachment(&filename));
    Ok(response)
}

/// POST /zip-downloads - Bundle finished files into a ZIP archive
#[utoipa::path(
    post,
    path = "/api/v1/zip-downloads",
    tag = "executor",
    request_body = ZipDownloadsBody,
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip"),
        (status = 400, description = "No filenames provided", body = StartDownloadResponse),
        (status = 404, description = "None of the files exist", body = StartDownloadResponse),
        (status = 500, description = "Archive could not be created", body = StartDownloadResponse)
    )
)]
pub async fn zip_downloads(
    State(state): State<AppState>,
    payload: Result<Json<ZipDownloadsBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };
    match state.downloader.backend().zip(&body.filenames).await {
        Ok(bundle) => {
            let mut response = Body::from_stream(ReaderStream::new(bundle.file)).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(bundle.len));
            headers.insert(header::CONTENT_DISPOSITION, attachment(&bundle.name));
            response
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build archive");
            failure_response(e)
        }
    }
}
