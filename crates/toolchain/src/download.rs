//! Artifact download into a scoped temporary directory.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::template::file_name_from_url;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BUFFER_SIZE: usize = 64 * 1024;

/// A downloaded artifact.
///
/// Owns the temporary directory holding the file: dropping the result
/// deletes the download, so copy anything worth keeping first.
#[derive(Debug)]
pub struct DownloadResult {
    /// Path of the downloaded file.
    pub path: PathBuf,
    /// Bytes written.
    pub size: u64,
    /// Logical tool name.
    pub tool: String,
    dir: TempDir,
}

impl DownloadResult {
    /// Directory containing the download, usable as scratch space for
    /// extraction.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Stream `url` into a fresh temporary directory.
///
/// The file is named after the last URL path segment. A progress bar is
/// drawn on stderr only when `show_progress` is set, the server announced a
/// length and stderr is a terminal.
///
/// # Errors
///
/// - `Error::DownloadNotFound` for HTTP 404.
/// - `Error::Transport` for other HTTP failures and for short bodies.
/// - `Error::Io` if the temporary file cannot be written.
pub fn download(
    backend: &dyn Backend,
    url: &str,
    tool: &str,
    show_progress: bool,
) -> Result<DownloadResult> {
    let dir = tempfile::Builder::new()
        .prefix("getkit-")
        .tempdir()
        .map_err(|e| Error::io(std::env::temp_dir(), e))?;

    let file_name = local_file_name(url, tool);
    let path = dir.path().join(&file_name);

    log::info!("Downloading {url}");
    let download = backend.open(url)?;
    let expected = download.content_length;

    let bar = progress_bar(expected, show_progress, &file_name);
    let mut reader: Box<dyn Read + Send> = match &bar {
        Some(bar) => Box::new(bar.wrap_read(download.reader)),
        None => download.reader,
    };

    let mut file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    let size = copy(&mut reader, &mut file, url, &path);
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let size = size?;
    file.flush().map_err(|e| Error::io(&path, e))?;

    if let Some(expected) = expected
        && size != expected
    {
        return Err(Error::transport(
            format!("{url}: expected {expected} bytes, received {size}"),
            None,
        ));
    }

    log::debug!("Downloaded {size} bytes to {}", path.display());
    Ok(DownloadResult {
        path,
        size,
        tool: tool.to_string(),
        dir,
    })
}

/// Copy the body, telling read failures (network) apart from write failures.
fn copy(reader: &mut dyn Read, file: &mut File, url: &str, path: &Path) -> Result<u64> {
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::transport(format!("{url}: {e}"), None)),
        };
        file.write_all(&buf[..n]).map_err(|e| Error::io(path, e))?;
        total += n as u64;
    }
}

fn progress_bar(length: Option<u64>, show_progress: bool, label: &str) -> Option<ProgressBar> {
    let length = length?;
    if !show_progress || !console::Term::stderr().is_term() {
        return None;
    }

    let bar = ProgressBar::new(length);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.set_message(label.to_string());
    Some(bar)
}

/// Name for the downloaded file: the last URL segment, or the tool name
/// when that segment is empty or a relative path component.
fn local_file_name(url: &str, tool: &str) -> String {
    match file_name_from_url(url) {
        name if name.is_empty() || name == "." || name == ".." => tool.to_string(),
        name => name,
    }
}
