//! Configuration types for offlinetube

use crate::error::{Error, Result};
use crate::types::Quality;
use serde::{Deserialize, Serialize};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};
use utoipa::ToSchema;

/// Download behavior configuration (directories, concurrency, qualities)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Directory finished files are written to (default: "./downloads/videos")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// URL path the download directory is served under (default: "/downloads/videos")
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Maximum number of tasks in flight against the executor (default: 2)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Quality used when a video has no per-video override (default: "480p")
    #[serde(default)]
    pub default_quality: Quality,

    /// Qualities offered for every catalog video
    #[serde(default = "default_available_qualities")]
    pub available_qualities: Vec<Quality>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            public_path: default_public_path(),
            max_concurrent_downloads: default_max_concurrent(),
            default_quality: Quality::default(),
            available_qualities: default_available_qualities(),
        }
    }
}

/// External tool configuration (yt-dlp)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Hard limit for one yt-dlp run before the process is killed (default: 2 hours)
    #[serde(default = "default_process_timeout", with = "duration_serde")]
    pub process_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            search_path: true,
            process_timeout: default_process_timeout(),
        }
    }
}

/// Which executor the scheduler talks to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Run yt-dlp in this process
    #[default]
    Local,
    /// Send requests to a remote executor over HTTP
    Remote,
}

/// Download executor client configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExecutorConfig {
    /// Local or remote executor (default: local)
    #[serde(default)]
    pub mode: ExecutorMode,

    /// Base URL of a remote executor API (default: "http://127.0.0.1:6789/api/v1")
    #[serde(default = "default_executor_base_url")]
    pub base_url: String,

    /// Deadline for a single executor request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Delay between completion checks (default: 2 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Deadline for an accepted download to complete (default: 2 hours)
    #[serde(default = "default_completion_deadline", with = "duration_serde")]
    pub completion_deadline: Duration,

    /// Mark tasks ready as soon as the executor acknowledges them (default: false)
    ///
    /// The acknowledgement only means the external process was launched, so a task
    /// reported ready this way may not have a complete file yet.
    #[serde(default)]
    pub trust_acknowledgement: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutorMode::default(),
            base_url: default_executor_base_url(),
            request_timeout: default_request_timeout(),
            poll_interval: default_poll_interval(),
            completion_deadline: default_completion_deadline(),
            trust_acknowledgement: false,
        }
    }
}

/// Video catalog (YouTube Data API v3) configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogConfig {
    /// API key; the catalog is disabled when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Channel browsed by default (e.g. "https://www.youtube.com/@example")
    #[serde(default)]
    pub channel_url: Option<String>,

    /// API base URL (default: "https://www.googleapis.com/youtube/v3")
    #[serde(default = "default_catalog_base_url")]
    pub api_base_url: String,

    /// Videos per page, at most 50 (default: 50)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            channel_url: None,
            api_base_url: default_catalog_base_url(),
            page_size: default_page_size(),
        }
    }
}

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6789)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for TubeDownloader
///
/// Download, tool and server settings are flattened so the JSON stays flat;
/// executor and catalog settings live under their own keys.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings (directories, concurrency, qualities)
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Download executor client settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Video catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    ///
    /// Recognises `YOUTUBE_API_KEY`, `YOUTUBE_CHANNEL_URL` and
    /// `OFFLINETUBE_CONCURRENT_DOWNLOADS`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(key) = lookup("YOUTUBE_API_KEY").filter(|v| !v.is_empty()) {
            self.catalog.api_key = Some(key);
        }
        if let Some(url) = lookup("YOUTUBE_CHANNEL_URL").filter(|v| !v.is_empty()) {
            self.catalog.channel_url = Some(url);
        }
        if let Some(raw) = lookup("OFFLINETUBE_CONCURRENT_DOWNLOADS") {
            self.download.max_concurrent_downloads =
                raw.trim().parse().map_err(|_| Error::Config {
                    message: format!("OFFLINETUBE_CONCURRENT_DOWNLOADS must be a number, got '{raw}'"),
                    key: Some("max_concurrent_downloads".to_string()),
                })?;
        }
        Ok(self)
    }

    /// Check settings that cannot be expressed through types alone
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }
        if self.download.default_quality.as_str().trim().is_empty() {
            return Err(Error::Config {
                message: "default_quality must not be empty".to_string(),
                key: Some("default_quality".to_string()),
            });
        }
        if self.catalog.page_size == 0 || self.catalog.page_size > 50 {
            return Err(Error::Config {
                message: "page_size must be between 1 and 50".to_string(),
                key: Some("catalog.page_size".to_string()),
            });
        }
        if self.executor.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll_interval must be greater than zero".to_string(),
                key: Some("executor.poll_interval".to_string()),
            });
        }
        if self.executor.mode == ExecutorMode::Remote {
            url::Url::parse(&self.executor.base_url).map_err(|e| Error::Config {
                message: format!("invalid executor base_url '{}': {}", self.executor.base_url, e),
                key: Some("executor.base_url".to_string()),
            })?;
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads/videos")
}

fn default_public_path() -> String {
    "/downloads/videos".to_string()
}

fn default_max_concurrent() -> usize {
    2
}

fn default_available_qualities() -> Vec<Quality> {
    ["1080p", "720p", "480p", "360p"]
        .into_iter()
        .map(Quality::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_process_timeout() -> Duration {
    Duration::from_secs(2 * 60 * 60)
}

fn default_executor_base_url() -> String {
    "http://127.0.0.1:6789/api/v1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_completion_deadline() -> Duration {
    Duration::from_secs(2 * 60 * 60)
}

fn default_catalog_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_page_size() -> u32 {
    50
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6789))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (as seconds)
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Configuration update for runtime-changeable settings
///
/// Only settings that can change while the scheduler is running are included.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ConfigUpdate {
    /// New concurrency budget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_downloads: Option<usize>,

    /// New default quality for future enqueues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_quality: Option<Quality>,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_json_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.download.max_concurrent_downloads, 2);
        assert_eq!(config.download.default_quality.as_str(), "480p");
        assert_eq!(config.download.public_path, "/downloads/videos");
        assert_eq!(config.executor.mode, ExecutorMode::Local);
        assert_eq!(config.executor.request_timeout, Duration::from_secs(30));
        assert!(!config.executor.trust_acknowledgement);
        assert_eq!(config.catalog.page_size, 50);
        assert_eq!(config.server.api.bind_address.port(), 6789);
        assert_eq!(
            config.download.available_qualities,
            vec![
                Quality::from("1080p"),
                Quality::from("720p"),
                Quality::from("480p"),
                Quality::from("360p")
            ]
        );
    }

    #[test]
    fn durations_round_trip_as_seconds() {
        let mut config = Config::default();
        config.executor.poll_interval = Duration::from_secs(5);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["executor"]["poll_interval"], 5);
        assert_eq!(json["max_concurrent_downloads"], 2, "download config is flattened");

        let parsed: Config = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.executor.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_zero_budget() {
        let mut config = Config::default();
        config.download.max_concurrent_downloads = 0;
        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("max_concurrent_downloads"))
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_oversized_page() {
        let mut config = Config::default();
        config.catalog.page_size = 51;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_remote_url() {
        let mut config = Config::default();
        config.executor.mode = ExecutorMode::Remote;
        config.executor.base_url = "not a url".into();
        assert!(config.validate().is_err());
        config.executor.base_url = "http://worker:6789/api/v1".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_apply_catalog_and_budget() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("YOUTUBE_API_KEY", "key-123"),
            ("YOUTUBE_CHANNEL_URL", "https://www.youtube.com/@example"),
            ("OFFLINETUBE_CONCURRENT_DOWNLOADS", "4"),
        ]);
        let config = Config::default()
            .with_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.catalog.api_key.as_deref(), Some("key-123"));
        assert_eq!(
            config.catalog.channel_url.as_deref(),
            Some("https://www.youtube.com/@example")
        );
        assert_eq!(config.download.max_concurrent_downloads, 4);
    }

    #[test]
    fn overrides_reject_non_numeric_budget() {
        let result = Config::default().with_overrides_from(|k| {
            (k == "OFFLINETUBE_CONCURRENT_DOWNLOADS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn from_json_file_reads_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"max_concurrent_downloads": 3, "executor": {"mode": "remote"}}"#,
        )
        .unwrap();
        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.download.max_concurrent_downloads, 3);
        assert_eq!(config.executor.mode, ExecutorMode::Remote);
    }

    #[test]
    fn from_json_file_reports_missing_file() {
        let result = Config::from_json_file("/nonexistent/offlinetube.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
