//! Windows 11 ISO acquisition: locate the latest installer image on the
//! Microsoft download page, then stream it to the local cache.
//!
//! The page scrape is deliberately narrow — a line scan plus one fixed
//! pattern anchored to the trusted download host. When Microsoft changes
//! the page layout the scan fails loudly with a parse error instead of
//! downloading something unexpected. Downloads are not resumed and the
//! image is not checksum-verified; both are known gaps.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::WinupError;

pub const WINDOWS_ISO_DOWNLOAD_PAGE: &str =
    "https://www.microsoft.com/en-us/software-download/windows11";

/// The page serves different markup to non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// A candidate line must carry all of these before the pattern is tried.
const REQUIRED_MARKERS: [&str; 3] = ["software-download", "iso", "href"];

/// Only direct links on the trusted download host count.
static ISO_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="(https://software-download\.microsoft\.com/[^"]+\.iso)""#)
        .expect("valid iso href pattern")
});

/// Fetch the download page and pull the first ISO link out of it.
pub async fn locate_latest(
    client: &reqwest::Client,
    page_url: &str,
) -> Result<String, WinupError> {
    tracing::info!(url = page_url, "fetching the windows 11 download page");

    let response = client
        .get(page_url)
        .send()
        .await
        .map_err(|e| WinupError::Network {
            url: page_url.to_string(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(WinupError::Network {
            url: page_url.to_string(),
            message: format!("HTTP {}", response.status()),
        });
    }

    let body = response.text().await.map_err(|e| WinupError::Network {
        url: page_url.to_string(),
        message: format!("error reading page body: {e}"),
    })?;

    extract_iso_url(&body).ok_or(WinupError::Parse)
}

/// Line scan + fixed pattern. First match wins; marker lines that do
/// not carry a conforming link are skipped, not fatal.
fn extract_iso_url(body: &str) -> Option<String> {
    for line in body.lines() {
        if !REQUIRED_MARKERS.iter().all(|m| line.contains(m)) {
            continue;
        }
        if let Some(caps) = ISO_HREF.captures(line) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Stream the ISO to `<dest_dir>/<filename>`. An already-downloaded
/// file is reused as-is. The body is written chunk by chunk through a
/// `.part` file renamed into place on success, so a previous failed run
/// never masquerades as a finished download.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    dest_dir: &Path,
    show_progress: bool,
) -> Result<PathBuf, WinupError> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| WinupError::Io {
            context: format!("creating download dir {}", dest_dir.display()),
            source: e,
        })?;

    let dest = dest_dir.join(iso_filename(url));
    if dest.exists() {
        tracing::info!(path = %dest.display(), "using previously downloaded iso");
        return Ok(dest);
    }

    tracing::info!(url, "downloading windows 11 iso");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| WinupError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(WinupError::Network {
            url: url.to_string(),
            message: format!("HTTP {}", response.status()),
        });
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = if show_progress {
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .expect("valid progress template")
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let tmp_path = dest.with_extension("part");

    // Remove any stale .part file from a previous failed download
    let _ = tokio::fs::remove_file(&tmp_path).await;

    if let Err(e) = download_to_file(url, &tmp_path, response, &pb).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&tmp_path, &dest)
        .await
        .map_err(|e| WinupError::Io {
            context: format!("renaming {} to {}", tmp_path.display(), dest.display()),
            source: e,
        })?;

    pb.finish_and_clear();
    tracing::info!(path = %dest.display(), "iso saved");

    Ok(dest)
}

/// Write a response body to a file in bounded-size chunks, updating the
/// progress bar as they arrive.
async fn download_to_file(
    url: &str,
    path: &Path,
    response: reqwest::Response,
    pb: &ProgressBar,
) -> Result<(), WinupError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| WinupError::Io {
            context: format!("creating temp file {}", path.display()),
            source: e,
        })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| WinupError::Network {
            url: url.to_string(),
            message: format!("error reading response body: {e}"),
        })?;
        file.write_all(&chunk).await.map_err(|e| WinupError::Io {
            context: "writing iso data".into(),
            source: e,
        })?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await.map_err(|e| WinupError::Io {
        context: "flushing iso file".into(),
        source: e,
    })?;

    Ok(())
}

fn iso_filename(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or("windows11.iso")
}
