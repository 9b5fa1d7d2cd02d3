//! Server-side media backend
//!
//! Launches yt-dlp for `start-download` requests, tracks each launched
//! process by the filename it writes, serves finished files, and bundles
//! them into ZIP archives. It also implements [`DownloadExecutor`] so the
//! scheduler can drive it in-process instead of over HTTP.

pub mod archive;
mod jobs;
mod ytdlp;

pub use archive::ZipBundle;
pub use jobs::JobRegistry;
pub use ytdlp::{YtDlp, build_args, format_args, parse_progress_line};

use crate::error::{Error, ExecutorError, Result};
use crate::executor::protocol::{StartDownloadBody, StartDownloadResponse};
use crate::executor::{CompletionState, DownloadExecutor, StartRequest};
use crate::types::{DownloadLocator, JobState, Quality, VideoId};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio_util::task::TaskTracker;

/// Message returned when `start-download` is missing a field
pub const MISSING_PARAMETERS: &str = "Missing required parameters: videoId, videoTitle, selectedQuality";

/// One file to fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchJob {
    /// Source video
    pub video_id: VideoId,
    /// Requested quality
    pub quality: Quality,
    /// Where the finished file goes
    pub output_path: PathBuf,
}

/// Something able to fetch a video into a file
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `job`, reporting percentages through `on_progress`
    ///
    /// Runs until the file is written or the fetch fails; the error is a
    /// message suitable for showing to users.
    async fn fetch(
        &self,
        job: &FetchJob,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> std::result::Result<(), String>;

    /// Whether this fetcher can run at all
    fn is_available(&self) -> bool;

    /// Get the name of this fetcher implementation
    fn name(&self) -> &'static str;
}

/// Fetcher used when no yt-dlp binary was found
pub struct UnavailableFetcher;

#[async_trait]
impl MediaFetcher for UnavailableFetcher {
    async fn fetch(
        &self,
        _job: &FetchJob,
        _on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> std::result::Result<(), String> {
        Err("yt-dlp is not installed".to_string())
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(
            r"[^a-zA-Z0-9_\u{3040}-\u{30ff}\u{3400}-\u{4dbf}\u{4e00}-\u{9fff}\u{ac00}-\u{d7af}.\-\s]",
        )
        .expect("static regex")
    })
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\s+").expect("static regex")
    })
}

/// Replace characters unsafe for filenames with `_`
///
/// Latin letters, digits, kana, CJK ideographs, hangul, `.`, `-` and `_` are
/// kept. Whitespace runs collapse to a single `_`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = unsafe_chars().replace_all(name, "_");
    whitespace_runs().replace_all(&replaced, "_").into_owned()
}

/// Output filename for a video: `{title}_{quality}_{id}.mp4`
pub fn build_filename(title: &str, quality: &Quality, video_id: &VideoId) -> String {
    format!(
        "{}_{}_{}.mp4",
        sanitize_filename(title),
        sanitize_filename(quality.as_str()),
        sanitize_filename(video_id.as_str())
    )
}

/// Launches and tracks downloads into a directory
pub struct MediaBackend {
    download_dir: PathBuf,
    public_path: String,
    fetcher: Arc<dyn MediaFetcher>,
    jobs: JobRegistry,
    processes: TaskTracker,
}

impl MediaBackend {
    /// Create a backend writing into `download_dir`, serving files under `public_path`
    pub fn new(
        download_dir: impl Into<PathBuf>,
        public_path: impl Into<String>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            download_dir: download_dir.into(),
            public_path: public_path.into().trim_end_matches('/').to_string(),
            fetcher,
            jobs: JobRegistry::new(),
            processes: TaskTracker::new(),
        }
    }

    /// Directory files are written to
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Name of the fetcher in use
    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Registry of launched jobs
    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Tracker of running fetch tasks
    pub fn processes(&self) -> &TaskTracker {
        &self.processes
    }

    /// URL a file is served under
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.public_path, urlencoding::encode(filename))
    }

    /// Validate a start request and launch the download in the background
    ///
    /// Returns as soon as the process is launched. Asking again for a file that
    /// is already being written, or already finished, acknowledges without
    /// launching a second process.
    pub async fn start_download(&self, body: &StartDownloadBody) -> Result<StartDownloadResponse> {
        if body.video_id.trim().is_empty()
            || body.video_title.trim().is_empty()
            || body.selected_quality.trim().is_empty()
        {
            return Err(Error::Validation(MISSING_PARAMETERS.to_string()));
        }
        if !self.fetcher.is_available() {
            return Err(Error::ExternalTool(
                "yt-dlp is not installed or not on PATH".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create download directory '{}': {}",
                        self.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let video_id = VideoId::new(body.video_id.trim());
        let quality = Quality::new(body.selected_quality.trim());
        let filename = build_filename(&body.video_title, &quality, &video_id);

        if self.jobs.try_begin(&filename) {
            let job = FetchJob {
                video_id: video_id.clone(),
                quality,
                output_path: self.download_dir.join(&filename),
            };
            self.launch(job, filename.clone());
        } else {
            tracing::info!(filename = %filename, "Download already running or finished, not relaunching");
        }

        Ok(StartDownloadResponse {
            success: true,
            message: Some("Download initiated successfully.".to_string()),
            video_id: Some(video_id.to_string()),
            download_url: Some(self.public_url(&filename)),
            filename: Some(filename),
        })
    }

    fn launch(&self, job: FetchJob, filename: String) {
        let fetcher = self.fetcher.clone();
        let jobs = self.jobs.clone();

        tracing::info!(video_id = %job.video_id, filename = %filename, fetcher = fetcher.name(), "Launching download");

        self.processes.spawn(async move {
            let progress_jobs = jobs.clone();
            let progress_name = filename.clone();
            let on_progress = move |percent: u8| progress_jobs.set_progress(&progress_name, percent);

            let result = fetcher.fetch(&job, &on_progress).await;
            match &result {
                Ok(()) => tracing::info!(filename = %filename, "Download finished"),
                Err(message) => tracing::error!(filename = %filename, error = %message, "Download failed"),
            }
            jobs.finish(&filename, result);
        });
    }

    /// State of a download
    ///
    /// Files written by an earlier run of this process count as completed.
    pub async fn job_state(&self, filename: &str) -> Option<JobState> {
        if !archive::is_safe_filename(filename) {
            return None;
        }
        if let Some(state) = self.jobs.state(filename) {
            return Some(state);
        }
        match tokio::fs::metadata(self.download_dir.join(filename)).await {
            Ok(meta) if meta.is_file() => Some(JobState::Completed),
            _ => None,
        }
    }

    /// Path of a downloaded file that is safe to serve
    pub async fn file_path(&self, filename: &str) -> Result<PathBuf> {
        if !archive::is_safe_filename(filename) {
            return Err(Error::NotFound(format!("file {}", filename)));
        }
        if let Some(JobState::Running { .. }) = self.jobs.state(filename) {
            return Err(Error::NotFound(format!("file {} (still downloading)", filename)));
        }
        let path = self.download_dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(Error::NotFound(format!("file {}", filename))),
        }
    }

    /// Bundle the named files into a ZIP archive
    pub async fn zip(&self, filenames: &[serde_json::Value]) -> Result<ZipBundle> {
        let files = archive::collect_files(&self.download_dir, filenames).await?;
        let count = files.len();
        let (file, len) = archive::build_zip(files).await?;
        let name = archive::archive_name(chrono::Local::now().date_naive());
        tracing::info!(files = count, archive = %name, bytes = len, "Created archive");
        Ok(ZipBundle { name, file, len })
    }
}

#[async_trait]
impl DownloadExecutor for MediaBackend {
    async fn start(
        &self,
        request: &StartRequest,
    ) -> std::result::Result<DownloadLocator, ExecutorError> {
        let body = StartDownloadBody {
            video_id: request.video_id.to_string(),
            video_title: request.title.clone(),
            selected_quality: request.quality.to_string(),
        };

        let response = self.start_download(&body).await.map_err(|e| {
            let message = match e {
                Error::Validation(message) | Error::ExternalTool(message) => message,
                other => other.to_string(),
            };
            ExecutorError::Rejected { message }
        })?;

        match (response.download_url, response.filename) {
            (Some(url), Some(filename)) => Ok(DownloadLocator { url, filename }),
            _ => Err(ExecutorError::InvalidResponse(
                "acknowledgement without downloadUrl or filename".into(),
            )),
        }
    }

    async fn completion(
        &self,
        locator: &DownloadLocator,
    ) -> std::result::Result<CompletionState, ExecutorError> {
        match self.job_state(&locator.filename).await {
            Some(JobState::Running { progress }) => Ok(CompletionState::Pending {
                progress: Some(progress),
            }),
            Some(JobState::Completed) => Ok(CompletionState::Completed),
            Some(JobState::Failed { message }) => Ok(CompletionState::Failed { message }),
            None => Err(ExecutorError::Rejected {
                message: format!("download {} is unknown to the executor", locator.filename),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
