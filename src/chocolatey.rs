//! Locating or bootstrapping Chocolatey, the host package manager.
//!
//! Resolution is a fixed-priority fallback chain, not a retry loop:
//! direct invocation first, then the registry install-location key,
//! then a short list of well-known filesystem locations. First match
//! wins; if a host somehow has choco at more than one location, the
//! earlier check is authoritative.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::WinupError;

pub const CHOCO_COMMAND: &str = "choco";

/// Official bootstrap one-liner, TLS 1.2 forced, executed through
/// PowerShell exactly as Chocolatey documents it.
const BOOTSTRAP_COMMAND: &str = concat!(
    "Set-ExecutionPolicy Bypass -Scope Process -Force; ",
    "[System.Net.ServicePointManager]::SecurityProtocol = ",
    "[System.Net.SecurityProtocolType]::Tls12; ",
    "iex ((New-Object System.Net.WebClient).DownloadString(",
    "'https://community.chocolatey.org/install.ps1'))",
);

/// How the choco binary was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChocoSource {
    /// `choco -v` succeeded, the bare command name is usable as-is.
    Direct,
    /// Located via the `ChocolateyInstall` registry value.
    Registry,
    /// Found at one of the well-known install locations.
    WellKnown,
}

/// Resolved package manager, valid for this run only.
#[derive(Debug, Clone)]
pub struct ResolvedChoco {
    pub path: PathBuf,
    pub source: ChocoSource,
}

impl ResolvedChoco {
    /// Directory holding the chocolatey shims, when the resolved path
    /// carries one. `Direct` resolutions are a bare command name with
    /// no parent directory.
    pub fn bin_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Locate an existing Chocolatey install. Returns `None` when every
/// fallback fails — the caller then decides whether to bootstrap.
pub async fn resolve() -> Result<Option<ResolvedChoco>, WinupError> {
    if direct_probe().await {
        tracing::debug!("choco answers directly on the search path");
        return Ok(Some(ResolvedChoco {
            path: PathBuf::from(CHOCO_COMMAND),
            source: ChocoSource::Direct,
        }));
    }

    if let Some(path) = registry_lookup().await {
        tracing::debug!(path = %path.display(), "choco located via registry");
        return Ok(Some(ResolvedChoco {
            path,
            source: ChocoSource::Registry,
        }));
    }

    if let Some(path) = first_existing(&well_known_paths()) {
        tracing::debug!(path = %path.display(), "choco located at well-known path");
        return Ok(Some(ResolvedChoco {
            path: path.to_path_buf(),
            source: ChocoSource::WellKnown,
        }));
    }

    Ok(None)
}

/// Download and run the official bootstrap script, then re-resolve.
/// Only called after `resolve()` returned `None`, which keeps the
/// operation idempotent across runs.
pub async fn install() -> Result<ResolvedChoco, WinupError> {
    tracing::info!("bootstrapping chocolatey");

    let status = Command::new("powershell.exe")
        .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
        .arg(BOOTSTRAP_COMMAND)
        .status()
        .await
        .map_err(|e| WinupError::Io {
            context: "running the chocolatey bootstrap".into(),
            source: e,
        })?;

    if !status.success() {
        return Err(WinupError::Toolchain {
            message: format!("chocolatey bootstrap exited with {status}"),
        });
    }

    match resolve().await? {
        Some(choco) => Ok(choco),
        None => Err(WinupError::Toolchain {
            message: "chocolatey bootstrap finished but no choco binary was found".into(),
        }),
    }
}

/// Does `choco -v` run and exit zero?
async fn direct_probe() -> bool {
    matches!(
        Command::new(CHOCO_COMMAND).arg("-v").output().await,
        Ok(output) if output.status.success()
    )
}

/// Query the `ChocolateyInstall` value under HKLM. Shelling out to
/// `reg query` keeps this consistent with every other host interaction
/// in the pipeline (subprocess in, exit status out).
#[cfg(windows)]
async fn registry_lookup() -> Option<PathBuf> {
    let output = Command::new("reg")
        .args([
            "query",
            r"HKLM\SOFTWARE\Chocolatey",
            "/v",
            "ChocolateyInstall",
        ])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let install_dir = parse_reg_value(&stdout)?;
    let choco = PathBuf::from(install_dir).join("bin").join("choco.exe");
    choco.exists().then_some(choco)
}

#[cfg(not(windows))]
async fn registry_lookup() -> Option<PathBuf> {
    None
}

/// Pull the REG_SZ payload out of `reg query` output. The value line
/// looks like `    ChocolateyInstall    REG_SZ    C:\ProgramData\chocolatey`
/// and the payload may contain spaces.
fn parse_reg_value(stdout: &str) -> Option<String> {
    let line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("ChocolateyInstall"))?;
    let (_, value) = line.split_once("REG_SZ")?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Fixed fallback locations, in priority order.
fn well_known_paths() -> Vec<PathBuf> {
    let local_app_data = std::env::var_os("LocalAppData")
        .map(PathBuf::from)
        .unwrap_or_default();
    let system_drive = std::env::var_os("SystemDrive")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:"));
    vec![
        PathBuf::from("C:/ProgramData/chocolatey/bin/choco.exe"),
        local_app_data.join("choco").join("bin").join("choco.exe"),
        system_drive.join("choco").join("bin").join("choco.exe"),
    ]
}

/// First path in the list that exists on disk.
fn first_existing(paths: &[PathBuf]) -> Option<&Path> {
    paths.iter().find(|p| p.exists()).map(PathBuf::as_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_existing_respects_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("second-choco.exe");
        let third = dir.path().join("third-choco.exe");
        std::fs::write(&second, b"").unwrap();
        std::fs::write(&third, b"").unwrap();

        // First entry is missing; the second existing entry must win
        // even though a later one exists too.
        let paths = vec![dir.path().join("missing-choco.exe"), second.clone(), third];
        assert_eq!(first_existing(&paths), Some(second.as_path()));
    }

    #[test]
    fn first_existing_empty_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![dir.path().join("a"), dir.path().join("b")];
        assert_eq!(first_existing(&paths), None);
    }

    #[test]
    fn well_known_list_starts_with_programdata() {
        let paths = well_known_paths();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].starts_with("C:/ProgramData"));
    }

    #[test]
    fn parses_reg_query_output() {
        let stdout = "\r\nHKEY_LOCAL_MACHINE\\SOFTWARE\\Chocolatey\r\n    ChocolateyInstall    REG_SZ    C:\\ProgramData\\chocolatey\r\n\r\n";
        assert_eq!(
            parse_reg_value(stdout).as_deref(),
            Some("C:\\ProgramData\\chocolatey")
        );
    }

    #[test]
    fn reg_value_with_spaces_survives() {
        let stdout = "    ChocolateyInstall    REG_SZ    C:\\Program Files\\chocolatey";
        assert_eq!(
            parse_reg_value(stdout).as_deref(),
            Some("C:\\Program Files\\chocolatey")
        );
    }

    #[test]
    fn reg_value_missing_yields_none() {
        assert_eq!(parse_reg_value("no value here"), None);
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        // Two consecutive resolves with no install in between must agree,
        // whatever the host looks like.
        let first = resolve().await.unwrap().map(|c| c.path);
        let second = resolve().await.unwrap().map(|c| c.path);
        assert_eq!(first, second);
    }

    #[test]
    fn direct_resolution_has_no_bin_dir() {
        let choco = ResolvedChoco {
            path: PathBuf::from(CHOCO_COMMAND),
            source: ChocoSource::Direct,
        };
        assert_eq!(choco.bin_dir(), None);
    }

    #[test]
    fn well_known_resolution_exposes_bin_dir() {
        let choco = ResolvedChoco {
            path: PathBuf::from("C:/ProgramData/chocolatey/bin/choco.exe"),
            source: ChocoSource::WellKnown,
        };
        assert_eq!(
            choco.bin_dir(),
            Some(Path::new("C:/ProgramData/chocolatey/bin"))
        );
    }
}
