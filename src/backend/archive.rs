//! Bundling downloaded files into a single ZIP archive

use crate::error::{ArchiveError, Error, Result};
use chrono::NaiveDate;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

/// Whether `name` may be looked up inside the download directory
///
/// The name must be a single path component: no separators, and not `.` or `..`.
/// Dots inside a name (`Wait..._what_720p_x.mp4`) are fine.
pub fn is_safe_filename(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(['/', '\\', '\0'])
}

/// Name offered for an archive created on `date`
pub fn archive_name(date: NaiveDate) -> String {
    format!("offlinetube_downloads_{}.zip", date.format("%Y-%m-%d"))
}

/// Filter the requested names down to files that exist in `download_dir`
///
/// Non-string entries, unsafe names and missing files are skipped with a log line.
pub async fn collect_files(
    download_dir: &Path,
    filenames: &[serde_json::Value],
) -> Result<Vec<(String, PathBuf)>> {
    if filenames.is_empty() {
        return Err(ArchiveError::NoFilenames.into());
    }

    let mut files = Vec::new();
    for value in filenames {
        let Some(name) = value.as_str() else {
            tracing::warn!(entry = %value, "Skipping non-string filename");
            continue;
        };
        if !is_safe_filename(name) {
            tracing::warn!(filename = name, "Skipping invalid filename");
            continue;
        }
        let path = download_dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push((name.to_string(), path)),
            _ => tracing::warn!(filename = name, "Skipping missing file"),
        }
    }

    if files.is_empty() {
        return Err(ArchiveError::NoValidFiles.into());
    }
    Ok(files)
}

/// A finished archive spooled to an anonymous temporary file
///
/// The file is removed by the OS once the handle is dropped.
pub struct ZipBundle {
    /// Name offered to the client
    pub name: String,
    /// Archive contents, positioned at the start
    pub file: tokio::fs::File,
    /// Archive size in bytes
    pub len: u64,
}

/// Write a ZIP of the given files at maximum deflate compression
///
/// The archive goes to a temporary file rather than memory so large bundles
/// can be streamed out.
pub async fn build_zip(files: Vec<(String, PathBuf)>) -> Result<(tokio::fs::File, u64)> {
    let (file, len) = tokio::task::spawn_blocking(move || write_zip(&files))
        .await
        .map_err(|e| Error::Other(format!("zip task failed: {}", e)))??;
    Ok((tokio::fs::File::from_std(file), len))
}

fn write_zip(files: &[(String, PathBuf)]) -> Result<(std::fs::File, u64)> {
    let mut writer = ZipWriter::new(tempfile::tempfile()?);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for (name, path) in files {
        let mut source = std::fs::File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to open {}: {}", path.display(), e),
            ))
        })?;
        writer.start_file(name.as_str(), options)?;
        std::io::copy(&mut source, &mut writer)?;
    }

    let mut file = writer.finish()?;
    let len = file.seek(SeekFrom::End(0))?;
    file.rewind()?;
    tracing::debug!(files = files.len(), bytes = len, "Archive built");
    Ok((file, len))
}
