//! Elevation check, behind a capability trait with one implementation
//! per target platform. Runs first in the pipeline, unconditionally,
//! and has no side effects — when it fails the only remedy is to
//! restart the process elevated.

use crate::error::WinupError;

pub trait PrivilegeChecker {
    /// Ok when the process holds administrative rights.
    fn check(&self) -> Result<(), WinupError>;
}

/// Select the checker for the current platform.
pub fn platform_checker() -> Box<dyn PrivilegeChecker> {
    #[cfg(windows)]
    return Box::new(WindowsElevation);
    #[cfg(unix)]
    return Box::new(RootElevation);
}

/// Windows: `net session` succeeds only in an elevated console, which
/// makes it a dependency-free elevation probe.
#[cfg(windows)]
pub struct WindowsElevation;

#[cfg(windows)]
impl PrivilegeChecker for WindowsElevation {
    fn check(&self) -> Result<(), WinupError> {
        let status = std::process::Command::new("net")
            .arg("session")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map_err(|e| WinupError::Io {
                context: "probing elevation via `net session`".into(),
                source: e,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(WinupError::Privilege)
        }
    }
}

/// Unix: installing system packages needs root.
#[cfg(unix)]
pub struct RootElevation;

#[cfg(unix)]
impl PrivilegeChecker for RootElevation {
    fn check(&self) -> Result<(), WinupError> {
        // SAFETY: geteuid has no preconditions and cannot fail.
        let euid = unsafe { libc::geteuid() };
        if euid == 0 {
            Ok(())
        } else {
            Err(WinupError::Privilege)
        }
    }
}
