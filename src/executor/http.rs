//! Executor reached over HTTP (`POST /start-download`, `GET /download-status/{filename}`)

use super::protocol::{StartDownloadBody, StartDownloadResponse};
use super::{CompletionState, DownloadExecutor, StartRequest};
use crate::error::ExecutorError;
use crate::types::{DownloadLocator, JobState};
use async_trait::async_trait;
use reqwest::StatusCode;

/// Talks to a remote executor API, such as another offlinetube instance
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecutor {
    /// Create an executor client for the API rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> crate::Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| crate::Error::Config {
            message: format!("invalid executor base_url '{}': {}", base_url, e),
            key: Some("executor.base_url".to_string()),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn unreachable(error: reqwest::Error) -> ExecutorError {
    ExecutorError::Unreachable {
        message: error.to_string(),
    }
}

#[async_trait]
impl DownloadExecutor for HttpExecutor {
    async fn start(&self, request: &StartRequest) -> Result<DownloadLocator, ExecutorError> {
        let body = StartDownloadBody {
            video_id: request.video_id.to_string(),
            video_title: request.title.clone(),
            selected_quality: request.quality.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/start-download", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        let text = response.text().await.map_err(unreachable)?;
        let parsed: Option<StartDownloadResponse> = serde_json::from_str(&text).ok();

        match parsed {
            Some(StartDownloadResponse {
                success: true,
                download_url: Some(url),
                filename: Some(filename),
                ..
            }) if status.is_success() => Ok(DownloadLocator { url, filename }),
            Some(StartDownloadResponse { success: true, .. }) if status.is_success() => Err(
                ExecutorError::InvalidResponse("acknowledgement without downloadUrl or filename".into()),
            ),
            Some(StartDownloadResponse {
                message: Some(message),
                ..
            }) => Err(ExecutorError::Rejected { message }),
            _ if status.is_success() => Err(ExecutorError::InvalidResponse(format!(
                "unexpected body: {}",
                text.chars().take(200).collect::<String>()
            ))),
            _ => Err(ExecutorError::Rejected {
                message: format!("Server responded with status {}", status.as_u16()),
            }),
        }
    }

    async fn completion(
        &self,
        locator: &DownloadLocator,
    ) -> Result<CompletionState, ExecutorError> {
        let response = self
            .client
            .get(format!(
                "{}/download-status/{}",
                self.base_url,
                urlencoding::encode(&locator.filename)
            ))
            .send()
            .await
            .map_err(unreachable)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ExecutorError::Rejected {
                    message: format!("download {} is unknown to the executor", locator.filename),
                });
            }
            status if !status.is_success() => {
                return Err(ExecutorError::InvalidResponse(format!(
                    "status check returned {}",
                    status.as_u16()
                )));
            }
            _ => {}
        }

        let state: JobState = response
            .json()
            .await
            .map_err(|e| ExecutorError::InvalidResponse(e.to_string()))?;

        Ok(match state {
            JobState::Running { progress } => CompletionState::Pending {
                progress: Some(progress),
            },
            JobState::Completed => CompletionState::Completed,
            JobState::Failed { message } => CompletionState::Failed { message },
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> StartRequest {
        StartRequest {
            video_id: "abc123".into(),
            title: "My Video".into(),
            quality: "720p".into(),
        }
    }

    #[tokio::test]
    async fn start_posts_camel_case_body_and_returns_locator() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/start-download"))
            .and(body_json(json!({
                "videoId": "abc123",
                "videoTitle": "My Video",
                "selectedQuality": "720p"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "Download initiated successfully.",
                "videoId": "abc123",
                "downloadUrl": "/downloads/videos/My_Video_720p_abc123.mp4",
                "filename": "My_Video_720p_abc123.mp4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(format!("{}/api/v1/", server.uri())).unwrap();
        let locator = executor.start(&request()).await.unwrap();
        assert_eq!(locator.filename, "My_Video_720p_abc123.mp4");
        assert_eq!(locator.url, "/downloads/videos/My_Video_720p_abc123.mp4");
    }

    #[tokio::test]
    async fn start_keeps_server_message_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-download"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "success": false,
                "message": "yt-dlp exited with code 1"
            })))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(server.uri()).unwrap();
        let err = executor.start(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ExecutorError::Rejected {
                message: "yt-dlp exited with code 1".into()
            }
        );
    }

    #[tokio::test]
    async fn start_without_json_body_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-download"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(server.uri()).unwrap();
        let err = executor.start(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Server responded with status 502");
    }

    #[tokio::test]
    async fn start_with_incomplete_ack_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/start-download"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(server.uri()).unwrap();
        let err = executor.start(&request()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn start_against_closed_port_is_unreachable() {
        let executor = HttpExecutor::new("http://127.0.0.1:9").unwrap();
        let err = executor.start(&request()).await.unwrap_err();
        assert!(
            err.to_string().starts_with("Could not reach server"),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn completion_maps_job_states() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download-status/running.mp4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"state": "running", "progress": 42})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download-status/done.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"state": "completed"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download-status/failed.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"state": "failed", "message": "yt-dlp exited with code 1"}),
            ))
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(server.uri()).unwrap();
        let check = |name: &str| DownloadLocator {
            url: format!("/downloads/videos/{name}"),
            filename: name.to_string(),
        };

        assert_eq!(
            executor.completion(&check("running.mp4")).await.unwrap(),
            CompletionState::Pending { progress: Some(42) }
        );
        assert_eq!(
            executor.completion(&check("done.mp4")).await.unwrap(),
            CompletionState::Completed
        );
        assert_eq!(
            executor.completion(&check("failed.mp4")).await.unwrap(),
            CompletionState::Failed {
                message: "yt-dlp exited with code 1".into()
            }
        );
    }

    #[tokio::test]
    async fn completion_of_unknown_file_is_rejected() {
        let server = MockServer::start().await;
        let executor = HttpExecutor::new(server.uri()).unwrap();
        let err = executor
            .completion(&DownloadLocator {
                url: "/downloads/videos/nope.mp4".into(),
                filename: "nope.mp4".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Rejected { .. }));
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        assert!(HttpExecutor::new("::not a url::").is_err());
    }
}
