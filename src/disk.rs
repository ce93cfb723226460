//! Persistent guest disk, created once with `qemu-img` and reused on
//! every later run.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::WinupError;

pub const DISK_FORMAT: &str = "qcow2";

/// The guest disk as seen by the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct DiskImage {
    pub path: PathBuf,
    pub size_gb: u32,
    /// True when the file predates this run. An existing image is never
    /// resized or validated against the requested size — that stays the
    /// caller's responsibility.
    pub exists: bool,
}

/// Idempotent disk preparation: an existing file short-circuits with no
/// subprocess call at all; otherwise `qemu-img create` runs exactly once.
pub async fn ensure_disk(
    qemu_img: &Path,
    path: &Path,
    size_gb: u32,
) -> Result<DiskImage, WinupError> {
    if path.exists() {
        tracing::info!(path = %path.display(), "disk image already exists");
        return Ok(DiskImage {
            path: path.to_path_buf(),
            size_gb,
            exists: true,
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| WinupError::Io {
                context: format!("creating directory {}", parent.display()),
                source: e,
            })?;
    }

    let output = Command::new(qemu_img)
        .args(create_args(path, size_gb))
        .output()
        .await
        .map_err(|e| WinupError::Io {
            context: "running qemu-img".into(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(WinupError::Tool {
            command: "qemu-img".into(),
            message: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    tracing::info!(path = %path.display(), size_gb, "created qcow2 disk image");
    Ok(DiskImage {
        path: path.to_path_buf(),
        size_gb,
        exists: false,
    })
}

/// Arguments for `qemu-img create`, kept separate so tests can pin the
/// exact invocation without running the binary.
fn create_args(path: &Path, size_gb: u32) -> Vec<String> {
    vec![
        "create".into(),
        "-f".into(),
        DISK_FORMAT.into(),
        path.display().to_string(),
        format!("{size_gb}G"),
    ]
}
