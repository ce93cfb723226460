use std::path::PathBuf;

use crate::error::WinupError;

/// Guest networking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NetMode {
    /// User-mode NAT (no host configuration needed).
    User,
    /// Bridged onto a host network interface.
    Bridge,
}

/// Fully resolved VM configuration, populated before the launch command
/// is assembled and handed by value between pipeline stages.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// RAM size string, e.g. `8G` or `4096M`.
    pub ram: String,
    pub cpus: u32,
    pub iso_path: PathBuf,
    pub disk_path: PathBuf,
    pub disk_size_gb: u32,
    pub net: NetMode,
}

impl VmConfig {
    /// Validate every field. Called eagerly after CLI parsing and again
    /// by the command builder before any token is assembled.
    pub fn validate(&self) -> Result<(), WinupError> {
        validate_ram(&self.ram)?;
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
        if self.iso_path.as_os_str().is_empty() {
            return Err(WinupError::Config {
                message: "iso path must not be empty".into(),
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

/// Check a RAM size string against the accepted grammar: one or more
/// digits followed by a single `M` or `G` suffix.
pub fn validate_ram(s: &str) -> Result<(), WinupError> {
    let s = s.trim();
    let Some(num) = s.strip_suffix(['M', 'G']) else {
        return Err(WinupError::Config {
            message: format!("ram must be digits followed by M or G (got '{s}')"),
        });
    };
    if num.is_empty() || !num.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WinupError::Config {
            message: format!("ram must be digits followed by M or G (got '{s}')"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> VmConfig {
        VmConfig {
            ram: "8G".into(),
            cpus: 4,
            iso_path: PathBuf::from("win11.iso"),
            disk_path: PathBuf::from("win11_vm.qcow2"),
            disk_size_gb: 60,
            net: NetMode::User,
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn ram_grammar_accepts_m_and_g() {
        assert!(validate_ram("8G").is_ok());
        assert!(validate_ram("4096M").is_ok());
    }

    #[test]
    fn ram_grammar_rejects_bad_suffix() {
        assert!(validate_ram("8").is_err());
        assert!(validate_ram("8T").is_err());
        assert!(validate_ram("8g").is_err());
    }

    #[test]
    fn ram_grammar_rejects_non_numeric() {
        assert!(validate_ram("G").is_err());
        assert!(validate_ram("8.5G").is_err());
        assert!(validate_ram("").is_err());
    }

    #[test]
    fn rejects_zero_cpus() {
        let mut config = valid_config();
        config.cpus = 0;
        assert!(matches!(
            config.validate(),
            Err(WinupError::Config { .. })
        ));
    }

    #[test]
    fn rejects_zero_disk_size() {
        let mut config = valid_config();
        config.disk_size_gb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_iso_path() {
        let mut config = valid_config();
        config.iso_path = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
