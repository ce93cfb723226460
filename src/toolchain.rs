//! Ensuring the QEMU toolchain (emulator + disk-image utility).
//!
//! Resolution never mutates the process environment: instead of
//! prepending to `PATH`, the probe takes explicit extra directories and
//! the result is an owned [`ResolvedTools`] value threaded into the
//! later stages.

use std::path::PathBuf;

use tokio::process::Command;

use crate::chocolatey::ResolvedChoco;
use crate::error::WinupError;

pub const QEMU_SYSTEM: &str = "qemu-system-x86_64";
pub const QEMU_IMG: &str = "qemu-img";

/// Chocolatey package that ships both binaries.
const QEMU_PACKAGE: &str = "qemu";

/// Absolute (or at least directly invocable) paths to the toolchain
/// executables, valid for this run only.
#[derive(Debug, Clone)]
pub struct ResolvedTools {
    pub qemu_system: PathBuf,
    pub qemu_img: PathBuf,
}

/// Make sure both QEMU executables are available, installing the
/// package through Chocolatey when either is missing.
pub async fn ensure(choco: &ResolvedChoco) -> Result<ResolvedTools, WinupError> {
    if let Some(tools) = probe_all(&[]) {
        tracing::info!("qemu tools already on the search path");
        return Ok(tools);
    }

    tracing::info!(package = QEMU_PACKAGE, "installing qemu via chocolatey");
    let status = Command::new(&choco.path)
        .args(["install", QEMU_PACKAGE, "-y"])
        .status()
        .await
        .map_err(|e| WinupError::Io {
            context: format!("running {} install", choco.path.display()),
            source: e,
        })?;

    if !status.success() {
        return Err(WinupError::Toolchain {
            message: format!("choco install {QEMU_PACKAGE} exited with {status}"),
        });
    }

    // A fresh install lands its shims next to choco itself, which is
    // not necessarily on PATH yet within this process.
    let extra: Vec<PathBuf> = choco
        .bin_dir()
        .map(|d| d.to_path_buf())
        .into_iter()
        .collect();

    probe_all(&extra).ok_or_else(|| WinupError::Toolchain {
        message: "qemu install finished but the binaries are still missing".into(),
    })
}

fn probe_all(extra_dirs: &[PathBuf]) -> Option<ResolvedTools> {
    Some(ResolvedTools {
        qemu_system: probe(QEMU_SYSTEM, extra_dirs)?,
        qemu_img: probe(QEMU_IMG, extra_dirs)?,
    })
}

/// Find an executable by searching the extra directories first, then
/// every `PATH` entry. Appends `.exe` on Windows.
pub fn probe(name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let file = exe_name(name);
    let path_dirs: Vec<PathBuf> = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default();

    extra_dirs
        .iter()
        .chain(path_dirs.iter())
        .map(|dir| dir.join(&file))
        .find(|candidate| candidate.is_file())
}

fn exe_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &std::path::Path, name: &str) -> PathBuf {
        let path = dir.join(exe_name(name));
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn probe_finds_binary_in_extra_dir() {
        let dir = tempfile::tempdir().unwrap();
        let expected = touch(dir.path(), "winup-test-probe");
        let found = probe("winup-test-probe", &[dir.path().to_path_buf()]);
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn probe_misses_absent_binary() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            probe("winup-definitely-not-here", &[dir.path().to_path_buf()]),
            None
        );
    }

    #[test]
    fn probe_prefers_earlier_extra_dir() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let expected = touch(first.path(), "winup-test-order");
        touch(second.path(), "winup-test-order");

        let found = probe(
            "winup-test-order",
            &[first.path().to_path_buf(), second.path().to_path_buf()],
        );
        assert_eq!(found, Some(expected));
    }

    #[test]
    fn probe_ignores_directories_with_matching_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(exe_name("winup-test-dir"))).unwrap();
        assert_eq!(probe("winup-test-dir", &[dir.path().to_path_buf()]), None);
    }

    #[cfg(windows)]
    #[test]
    fn exe_name_appends_suffix() {
        assert_eq!(exe_name("qemu-img"), "qemu-img.exe");
    }

    #[cfg(not(windows))]
    #[test]
    fn exe_name_is_plain() {
        assert_eq!(exe_name("qemu-img"), "qemu-img");
    }
}
