//! Download Executor Client boundary
//!
//! An executor launches the external media download for one video. The contract
//! has three states: a request is acknowledged with a [`DownloadLocator`]
//! (accepted, file pending), and completion is then observed separately until it
//! reports [`CompletionState::Completed`] or [`CompletionState::Failed`].
//!
//! Nothing here cancels a launched download. Removing or pausing a task only
//! stops the scheduler from watching it; the external process runs to its end.

mod http;
pub mod protocol;

pub use http::HttpExecutor;

use crate::config::ExecutorConfig;
use crate::error::ExecutorError;
use crate::types::{DownloadLocator, Quality, VideoId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What to download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartRequest {
    /// Video identifier
    pub video_id: VideoId,
    /// Video title, used to name the file
    pub title: String,
    /// Requested quality
    pub quality: Quality,
}

/// Progress of an accepted download
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionState {
    /// Still running
    Pending {
        /// Progress percentage if the executor knows it
        progress: Option<u8>,
    },
    /// File is complete
    Completed,
    /// Download failed after being accepted
    Failed {
        /// Failure reason
        message: String,
    },
}

/// A backend able to run downloads
///
/// # Examples
///
/// ```no_run
/// use offlinetube::executor::{DownloadExecutor, HttpExecutor, StartRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = HttpExecutor::new("http://127.0.0.1:6789/api/v1")?;
/// let locator = executor
///     .start(&StartRequest {
///         video_id: "dQw4w9WgXcQ".into(),
///         title: "Never Gonna Give You Up".into(),
///         quality: "720p".into(),
///     })
///     .await?;
/// println!("writing {}", locator.filename);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait DownloadExecutor: Send + Sync {
    /// Launch a download and return where the file will be
    ///
    /// Returning `Ok` means the download was accepted, not that it is complete.
    async fn start(&self, request: &StartRequest) -> Result<DownloadLocator, ExecutorError>;

    /// Report the state of a previously accepted download
    async fn completion(&self, locator: &DownloadLocator)
    -> Result<CompletionState, ExecutorError>;

    /// Get the name of this executor implementation
    fn name(&self) -> &'static str;
}

/// How waiting for completion ended without an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waited {
    /// The executor reported the file complete
    Completed,
    /// The caller stopped caring (task removed, paused or re-admitted)
    Abandoned,
}

/// Wraps a [`DownloadExecutor`] with deadlines and completion polling
#[derive(Clone)]
pub struct ExecutorClient {
    executor: Arc<dyn DownloadExecutor>,
    request_timeout: Duration,
    poll_interval: Duration,
    completion_deadline: Duration,
}

impl ExecutorClient {
    /// Create a client using the timing settings from `config`
    pub fn new(executor: Arc<dyn DownloadExecutor>, config: &ExecutorConfig) -> Self {
        Self {
            executor,
            request_timeout: config.request_timeout,
            poll_interval: config.poll_interval,
            completion_deadline: config.completion_deadline,
        }
    }

    /// Name of the wrapped executor
    pub fn name(&self) -> &'static str {
        self.executor.name()
    }

    /// Send a start request, failing if no answer arrives within the request timeout
    pub async fn start(&self, request: &StartRequest) -> Result<DownloadLocator, ExecutorError> {
        tokio::time::timeout(self.request_timeout, self.executor.start(request))
            .await
            .map_err(|_| ExecutorError::RequestTimeout {
                after_secs: self.request_timeout.as_secs(),
            })?
    }

    /// Poll until the download completes, fails, or the completion deadline passes
    ///
    /// `on_pending` runs after every pending poll with the reported progress;
    /// returning `false` stops polling with [`Waited::Abandoned`]. Transient
    /// failures (unreachable executor, slow status answer) are retried until the
    /// deadline.
    pub async fn wait_for_completion<F>(
        &self,
        locator: &DownloadLocator,
        mut on_pending: F,
    ) -> Result<Waited, ExecutorError>
    where
        F: FnMut(Option<u8>) -> bool + Send,
    {
        let poll = async {
            loop {
                let state = tokio::time::timeout(
                    self.request_timeout,
                    self.executor.completion(locator),
                )
                .await
                .map_err(|_| ExecutorError::RequestTimeout {
                    after_secs: self.request_timeout.as_secs(),
                })
                .and_then(|r| r);

                match state {
                    Ok(CompletionState::Completed) => return Ok(Waited::Completed),
                    Ok(CompletionState::Failed { message }) => {
                        return Err(ExecutorError::Rejected { message });
                    }
                    Ok(CompletionState::Pending { progress }) => {
                        if !on_pending(progress) {
                            return Ok(Waited::Abandoned);
                        }
                    }
                    Err(e @ ExecutorError::Unreachable { .. })
                    | Err(e @ ExecutorError::RequestTimeout { .. }) => {
                        tracing::warn!(
                            filename = %locator.filename,
                            error = %e,
                            "Completion check failed, will retry"
                        );
                        if !on_pending(None) {
                            return Ok(Waited::Abandoned);
                        }
                    }
                    Err(e) => return Err(e),
                }

                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.completion_deadline, poll)
            .await
            .map_err(|_| ExecutorError::CompletionTimeout {
                after_secs: self.completion_deadline.as_secs(),
            })?
    }
}
