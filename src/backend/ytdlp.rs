//! yt-dlp process runner

use super::{FetchJob, MediaFetcher};
use crate::types::Quality;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Runs downloads through the `yt-dlp` command line tool
pub struct YtDlp {
    binary_path: PathBuf,
    process_timeout: Duration,
}

impl YtDlp {
    /// Use the binary at `binary_path`
    pub fn new(binary_path: PathBuf, process_timeout: Duration) -> Self {
        Self {
            binary_path,
            process_timeout,
        }
    }

    /// Find `yt-dlp` in PATH
    pub fn from_path(process_timeout: Duration) -> Option<Self> {
        which::which("yt-dlp")
            .ok()
            .map(|path| Self::new(path, process_timeout))
    }

    /// Path to the binary in use
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

/// Format selection arguments for a quality label
///
/// `audio_only` picks the best m4a audio stream; a height label prefers mp4
/// video at that resolution merged with m4a audio.
pub fn format_args(quality: &Quality) -> Vec<String> {
    if quality.is_audio_only() {
        return vec!["-f".to_string(), "bestaudio[ext=m4a]/bestaudio".to_string()];
    }
    match quality.height() {
        Some(height) => vec![
            "-S".to_string(),
            format!("res:{height},ext:mp4:m4a"),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ],
        None => vec![
            "-S".to_string(),
            "ext:mp4:m4a".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ],
    }
}

/// Full argument list for one download
pub fn build_args(job: &FetchJob) -> Vec<String> {
    let mut args = format_args(&job.quality);
    args.extend([
        "--newline".to_string(),
        "--no-playlist".to_string(),
        "-o".to_string(),
        job.output_path.to_string_lossy().into_owned(),
        format!("{WATCH_URL}{}", job.video_id),
    ]);
    args
}

fn progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("static regex")
    })
}

/// Extract the percentage from a `[download]  42.3% of ...` line
pub fn parse_progress_line(line: &str) -> Option<u8> {
    let caps = progress_regex().captures(line.trim_start())?;
    let value: f32 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, 100.0).floor() as u8)
}

#[async_trait]
impl MediaFetcher for YtDlp {
    async fn fetch(&self, job: &FetchJob, on_progress: &(dyn Fn(u8) + Send + Sync)) -> Result<(), String> {
        let args = build_args(job);
        tracing::debug!(binary = %self.binary_path.display(), ?args, "Spawning yt-dlp");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to execute yt-dlp: {e}"))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stderr_task = tokio::spawn(async move {
            let mut last = None;
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        last = Some(line);
                    }
                }
            }
            last
        });

        let run = async {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(percent) = parse_progress_line(&line) {
                        on_progress(percent);
                    }
                }
            }
            child.wait().await
        };

        let outcome = tokio::time::timeout(self.process_timeout, run).await;
        let status = match outcome {
            Ok(status) => status.map_err(|e| format!("Failed to wait for yt-dlp: {e}"))?,
            Err(_) => {
                tracing::error!(
                    video_id = %job.video_id,
                    timeout_secs = self.process_timeout.as_secs(),
                    "yt-dlp timed out, killing"
                );
                let _ = child.kill().await;
                return Err(format!(
                    "yt-dlp timed out after {}s",
                    self.process_timeout.as_secs()
                ));
            }
        };

        let last_stderr = stderr_task.await.ok().flatten();

        if status.success() {
            return Ok(());
        }

        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        if let Some(line) = &last_stderr {
            tracing::warn!(video_id = %job.video_id, stderr = %line, "yt-dlp failed");
        }
        Err(format!("yt-dlp exited with code {code}"))
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
