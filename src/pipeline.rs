//! The provisioning pipeline: a strictly linear sequence of fallible
//! stages, each consuming the validated output of the previous one.
//!
//! One run is one pass through the state machine
//! `NotStarted → Running → Done | Failed`. `Failed` is terminal: there
//! is no resume and no compensating rollback — a partially-downloaded
//! image or a half-finished toolchain install is left in place, and a
//! repeated run starts the full sequence again.

use std::path::PathBuf;
use std::time::Duration;

use crate::chocolatey;
use crate::config::{NetMode, VmConfig};
use crate::disk;
use crate::error::WinupError;
use crate::iso;
use crate::launch;
use crate::privilege::PrivilegeChecker;
use crate::progress::{OutputMode, StepProgress};
use crate::toolchain;

const TOTAL_STEPS: usize = 5;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline lifecycle for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// Everything the pipeline needs, straight from the CLI. The ISO path
/// is optional here — acquisition fills it in before the config is
/// finalized.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub ram: String,
    pub cpus: u32,
    pub disk_size_gb: u32,
    pub iso: Option<PathBuf>,
    pub disk_path: PathBuf,
    pub net: NetMode,
    pub download_dir: PathBuf,
}

impl ProvisionRequest {
    /// Grammar checks on the CLI-facing fields. Run before the pipeline
    /// starts so a malformed request aborts before any subprocess is
    /// invoked; the ISO path may still be unresolved at this point.
    pub fn validate(&self) -> Result<(), WinupError> {
        crate::config::validate_ram(&self.ram)?;
        if self.cpus == 0 {
            return Err(WinupError::Config {
                message: "cpus must be greater than zero".into(),
            });
        }
        if self.disk_size_gb == 0 {
            return Err(WinupError::Config {
                message: "disk size must be greater than zero".into(),
            });
        }
        if self.disk_path.as_os_str().is_empty() {
            return Err(WinupError::Config {
                message: "disk image path must not be empty".into(),
            });
        }
        Ok(())
    }
}

pub struct Pipeline {
    state: RunState,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            state: RunState::NotStarted,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every stage in order, then launch the VM with the console
    /// inherited. Any stage error aborts the whole run.
    pub async fn run(
        &mut self,
        checker: &dyn PrivilegeChecker,
        request: ProvisionRequest,
        mode: OutputMode,
    ) -> Result<(), WinupError> {
        self.state = RunState::Running;
        let result = run_stages(checker, request, mode).await;
        self.state = match result {
            Ok(()) => RunState::Done,
            Err(_) => RunState::Failed,
        };
        result
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_stages(
    checker: &dyn PrivilegeChecker,
    request: ProvisionRequest,
    mode: OutputMode,
) -> Result<(), WinupError> {
    let mut progress = StepProgress::new(TOTAL_STEPS, mode);

    // Stage 1: privilege check, first and unconditionally.
    progress
        .run("Checking administrator rights", || async {
            checker.check()
        })
        .await?;

    // Stage 2: locate or bootstrap the package manager.
    let choco = progress
        .run("Ensuring package manager", || async {
            match chocolatey::resolve().await? {
                Some(choco) => Ok(choco),
                None => chocolatey::install().await,
            }
        })
        .await?;
    tracing::debug!(path = %choco.path.display(), source = ?choco.source, "package manager ready");

    // Stage 3: emulator + disk-image utility.
    let tools = progress
        .run("Ensuring QEMU toolchain", || async {
            toolchain::ensure(&choco).await
        })
        .await?;

    // Stage 4: installation media, downloaded only when not supplied.
    let iso_path = match request.iso {
        Some(path) => {
            if !path.exists() {
                return Err(WinupError::Config {
                    message: format!("iso not found: {}", path.display()),
                });
            }
            progress.skip("Using provided ISO");
            path
        }
        None => {
            let show_bars = progress.show_bars();
            let download_dir = request.download_dir.clone();
            progress
                .run("Acquiring Windows 11 ISO", || async move {
                    let client = reqwest::Client::builder()
                        .user_agent(iso::BROWSER_USER_AGENT)
                        .connect_timeout(CONNECT_TIMEOUT)
                        .build()
                        .map_err(|e| WinupError::Network {
                            url: iso::WINDOWS_ISO_DOWNLOAD_PAGE.into(),
                            message: e.to_string(),
                        })?;
                    let url =
                        iso::locate_latest(&client, iso::WINDOWS_ISO_DOWNLOAD_PAGE).await?;
                    iso::download(&client, &url, &download_dir, show_bars).await
                })
                .await?
        }
    };

    // Stage 5: persistent guest disk, created at most once.
    let disk_image = progress
        .run("Preparing disk image", || async {
            disk::ensure_disk(&tools.qemu_img, &request.disk_path, request.disk_size_gb).await
        })
        .await?;

    // Stage 6: assemble and launch. Building is pure; validation runs
    // before any token exists.
    let config = VmConfig {
        ram: request.ram,
        cpus: request.cpus,
        iso_path,
        disk_path: disk_image.path,
        disk_size_gb: disk_image.size_gb,
        net: request.net,
    };
    let command = launch::build(&config, &tools)?;

    progress.println(&format!("Launching VM: {}", command.display_line()));

    let status = tokio::process::Command::new(&command.program)
        .args(&command.args)
        .status()
        .await
        .map_err(|e| WinupError::Io {
            context: format!("launching {}", command.program.display()),
            source: e,
        })?;

    // The installer runs interactively inside the guest; the emulator's
    // own exit status is informational, not a pipeline failure.
    if status.success() {
        tracing::info!("qemu exited cleanly");
    } else {
        tracing::warn!(%status, "qemu exited with a non-zero status");
    }

    Ok(())
}
