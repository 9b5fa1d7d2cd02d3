//! Error types for offlinetube
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (task control, executor, archive, catalog)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for offlinetube operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for offlinetube
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Malformed request input
    #[error("validation error: {0}")]
    Validation(String),

    /// Queue control error (unknown task, invalid transition)
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Download executor error
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    /// Archive bundling error
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Video catalog error
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ZIP writer error
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// External tool execution failed (yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by user-issued queue intents
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with this id is in the queue
    #[error("task {id} not found")]
    NotFound {
        /// The video ID that was not found
        id: String,
    },

    /// The intent is not valid for the task's current status
    #[error("cannot {operation} task {id} in state {current_state}")]
    InvalidState {
        /// The video ID
        id: String,
        /// The operation that was attempted (e.g., "pause", "retry")
        operation: String,
        /// The status that prevents the operation (e.g., "ready")
        current_state: String,
    },
}

/// Errors at the download executor boundary
///
/// The scheduler turns every one of these into a task `error` carrying the
/// `Display` text, so the messages are written for end users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The executor refused or failed the request; message is kept verbatim
    #[error("{message}")]
    Rejected {
        /// Reason reported by the executor
        message: String,
    },

    /// The executor could not be reached
    #[error("Could not reach server: {message}")]
    Unreachable {
        /// Underlying transport failure
        message: String,
    },

    /// The start request got no answer in time
    #[error("executor did not respond within {after_secs}s")]
    RequestTimeout {
        /// Deadline that elapsed, in seconds
        after_secs: u64,
    },

    /// An accepted download did not finish in time
    #[error("download did not complete within {after_secs}s")]
    CompletionTimeout {
        /// Deadline that elapsed, in seconds
        after_secs: u64,
    },

    /// The executor answered with something that is not a valid response
    #[error("invalid executor response: {0}")]
    InvalidResponse(String),
}

/// Archive bundling errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Request named no files at all
    #[error("No filenames provided.")]
    NoFilenames,

    /// None of the requested files exist or all names were rejected
    #[error("No valid files found to zip.")]
    NoValidFiles,
}

/// Video catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No API key configured
    #[error("video catalog is not configured (missing API key)")]
    NotConfigured,

    /// Channel reference could not be parsed
    #[error("invalid channel URL: {0}")]
    InvalidChannelUrl(String),

    /// Channel does not exist
    #[error("channel {0} not found")]
    ChannelNotFound(String),

    /// The catalog API returned an error
    #[error("catalog API error ({status}): {message}")]
    Api {
        /// HTTP status returned by the API
        status: u16,
        /// Message from the API error body
        message: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task error: task abc123 not found",
///     "details": {
///       "video_id": "abc123"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Archive(ArchiveError::NoFilenames) => 400,
            Error::Catalog(CatalogError::InvalidChannelUrl(_)) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Archive(ArchiveError::NoValidFiles) => 404,
            Error::Catalog(CatalogError::ChannelNotFound(_)) => 404,

            // 409 Conflict - Intent not valid in the current state
            Error::Task(TaskError::InvalidState { .. }) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::Zip(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Network(_) => 502,
            Error::Catalog(CatalogError::Api { .. }) => 502,
            Error::Executor(ExecutorError::Rejected { .. }) => 502,
            Error::Executor(ExecutorError::Unreachable { .. }) => 502,
            Error::Executor(ExecutorError::InvalidResponse(_)) => 502,

            // 504 Gateway Timeout
            Error::Executor(ExecutorError::RequestTimeout { .. }) => 504,
            Error::Executor(ExecutorError::CompletionTimeout { .. }) => 504,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,
            Error::Catalog(CatalogError::NotConfigured) => 503,

            // 501 Not Implemented - Feature not supported
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidState { .. } => "invalid_state",
            },
            Error::Executor(e) => match e {
                ExecutorError::Rejected { .. } => "executor_rejected",
                ExecutorError::Unreachable { .. } => "executor_unreachable",
                ExecutorError::RequestTimeout { .. } => "executor_timeout",
                ExecutorError::CompletionTimeout { .. } => "completion_timeout",
                ExecutorError::InvalidResponse(_) => "invalid_executor_response",
            },
            Error::Archive(e) => match e {
                ArchiveError::NoFilenames => "no_filenames",
                ArchiveError::NoValidFiles => "no_valid_files",
            },
            Error::Catalog(e) => match e {
                CatalogError::NotConfigured => "catalog_not_configured",
                CatalogError::InvalidChannelUrl(_) => "invalid_channel_url",
                CatalogError::ChannelNotFound(_) => "channel_not_found",
                CatalogError::Api { .. } => "catalog_api_error",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Zip(_) => "zip_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Task(TaskError::NotFound { id }) => Some(serde_json::json!({
                "video_id": id,
            })),
            Error::Task(TaskError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "video_id": id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Catalog(CatalogError::Api { status, .. }) => Some(serde_json::json!({
                "upstream_status": status,
            })),
            _ => None,
        };

        match details {
            Some(details) => Self::with_details(code, message, details),
            None => Self::new(code, message),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a vec of (Error, expected_status_code, expected_error_code) for
    /// every reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("max_concurrent_downloads".into()),
                },
                400,
                "config_error",
            ),
            (Error::Validation("missing videoId".into()), 400, "validation_error"),
            (Error::NotFound("file x.mp4".into()), 404, "not_found"),
            (
                Error::Task(TaskError::NotFound { id: "v1".into() }),
                404,
                "task_not_found",
            ),
            (
                Error::Task(TaskError::InvalidState {
                    id: "v1".into(),
                    operation: "retry".into(),
                    current_state: "ready".into(),
                }),
                409,
                "invalid_state",
            ),
            (
                Error::Executor(ExecutorError::Rejected {
                    message: "yt-dlp exited with code 1".into(),
                }),
                502,
                "executor_rejected",
            ),
            (
                Error::Executor(ExecutorError::Unreachable {
                    message: "connection refused".into(),
                }),
                502,
                "executor_unreachable",
            ),
            (
                Error::Executor(ExecutorError::RequestTimeout { after_secs: 30 }),
                504,
                "executor_timeout",
            ),
            (
                Error::Executor(ExecutorError::CompletionTimeout { after_secs: 60 }),
                504,
                "completion_timeout",
            ),
            (
                Error::Executor(ExecutorError::InvalidResponse("no filename".into())),
                502,
                "invalid_executor_response",
            ),
            (Error::Archive(ArchiveError::NoFilenames), 400, "no_filenames"),
            (Error::Archive(ArchiveError::NoValidFiles), 404, "no_valid_files"),
            (
                Error::Catalog(CatalogError::NotConfigured),
                503,
                "catalog_not_configured",
            ),
            (
                Error::Catalog(CatalogError::InvalidChannelUrl("nope".into())),
                400,
                "invalid_channel_url",
            ),
            (
                Error::Catalog(CatalogError::ChannelNotFound("@ghost".into())),
                404,
                "channel_not_found",
            ),
            (
                Error::Catalog(CatalogError::Api {
                    status: 403,
                    message: "quota exceeded".into(),
                }),
                502,
                "catalog_api_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
            (Error::ShuttingDown, 503, "shutting_down"),
            (
                Error::ExternalTool("yt-dlp not found".into()),
                503,
                "external_tool_error",
            ),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "Error variant with expected status={expected_status} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn rejected_message_is_kept_verbatim() {
        let err = ExecutorError::Rejected {
            message: "yt-dlp exited with code 1".into(),
        };
        assert_eq!(err.to_string(), "yt-dlp exited with code 1");
    }

    #[test]
    fn unreachable_message_names_the_server() {
        let err = ExecutorError::Unreachable {
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "Could not reach server: connection refused");
    }

    #[test]
    fn api_error_from_invalid_state_has_context() {
        let api: ApiError = Error::Task(TaskError::InvalidState {
            id: "v1".into(),
            operation: "pause".into(),
            current_state: "ready".into(),
        })
        .into();
        assert_eq!(api.error.code, "invalid_state");
        let details = api.error.details.unwrap();
        assert_eq!(details["video_id"], "v1");
        assert_eq!(details["operation"], "pause");
        assert_eq!(details["current_state"], "ready");
    }

    #[test]
    fn api_error_without_context_omits_details() {
        let api: ApiError = Error::ShuttingDown.into();
        let json = serde_json::to_value(&api).unwrap();
        assert!(json["error"].get("details").is_none());
        assert_eq!(json["error"]["code"], "shutting_down");
    }
}
