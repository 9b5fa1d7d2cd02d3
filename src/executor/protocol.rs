//! JSON bodies exchanged with a download executor over HTTP

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /start-download`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadBody {
    /// Video identifier
    #[serde(default)]
    pub video_id: String,
    /// Video title, used to build the filename
    #[serde(default)]
    pub video_title: String,
    /// Quality label such as `720p` or `audio_only`
    #[serde(default, alias = "quality")]
    pub selected_quality: String,
}

/// Response of `POST /start-download`
///
/// On success every optional field is set; on failure only `message` is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadResponse {
    /// Whether the download was launched
    pub success: bool,
    /// Human readable status or failure reason
    #[serde(default)]
    pub message: Option<String>,
    /// Echo of the requested video id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    /// URL the file will be served under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Name of the file being written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl StartDownloadResponse {
    /// A failure response carrying `message`
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            video_id: None,
            download_url: None,
            filename: None,
        }
    }
}

/// Body of `POST /zip-downloads`
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ZipDownloadsBody {
    /// Filenames to bundle; non-string entries are skipped
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub filenames: Vec<serde_json::Value>,
}
