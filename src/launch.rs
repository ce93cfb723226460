//! QEMU launch command assembly. Pure: validation first, then token
//! building, no filesystem or subprocess access.

use std::path::PathBuf;

use crate::config::{NetMode, VmConfig};
use crate::error::WinupError;
use crate::toolchain::ResolvedTools;

/// Fixed CPU feature / acceleration profile (Hyper-V enlightenments for
/// a Windows guest, TCG so the VM boots even without KVM/WHPX).
const CPU_PROFILE: &str = "host,hv_relaxed,hv_vapic,hv_spinlocks=0x1fff";
const MACHINE_PROFILE: &str = "type=pc,accel=tcg";

/// The assembled launch invocation. Immutable once built; the pipeline
/// consumes it exactly once.
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Single-line rendering for the pre-launch log message.
    pub fn display_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Build the QEMU invocation from a validated config. Fails with a
/// config error before assembling a single token if any field is
/// malformed.
pub fn build(config: &VmConfig, tools: &ResolvedTools) -> Result<LaunchCommand, WinupError> {
    config.validate()?;

    let mut args: Vec<String> = vec![
        "-m".into(),
        config.ram.clone(),
        "-smp".into(),
        config.cpus.to_string(),
        "-drive".into(),
        format!("file={},format=qcow2", config.disk_path.display()),
        "-cdrom".into(),
        config.iso_path.display().to_string(),
        "-boot".into(),
        "order=d".into(),
        "-cpu".into(),
        CPU_PROFILE.into(),
        "-machine".into(),
        MACHINE_PROFILE.into(),
        "-vga".into(),
        "std".into(),
        "-usb".into(),
        "-device".into(),
        "usb-tablet".into(),
    ];
    args.extend(net_tokens(config.net));

    Ok(LaunchCommand {
        program: tools.qemu_system.clone(),
        args,
    })
}

/// Network token group. The two modes are mutually exclusive: exactly
/// one backend is emitted, always paired with the same NIC model.
fn net_tokens(net: NetMode) -> Vec<String> {
    let backend = match net {
        NetMode::User => "user,id=net0",
        NetMode::Bridge => "bridge,id=net0",
    };
    vec![
        "-netdev".into(),
        backend.into(),
        "-device".into(),
        "e1000,netdev=net0".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> ResolvedTools {
        ResolvedTools {
            qemu_system: PathBuf::from("qemu-system-x86_64"),
            qemu_img: PathBuf::from("qemu-img"),
        }
    }

    fn config(net: NetMode) -> VmConfig {
        VmConfig {
            ram: "8G".into(),
            cpus: 4,
            iso_path: PathBuf::from(r"C:\win.iso"),
            disk_path: PathBuf::from(r"D:\disk.qcow2"),
            disk_size_gb: 60,
            net,
        }
    }

    fn count(args: &[String], token: &str) -> usize {
        args.iter().filter(|a| a.as_str() == token).count()
    }

    /// Count of `flag value` adjacent pairs in the token list.
    fn count_pair(args: &[String], flag: &str, value: &str) -> usize {
        args.windows(2)
            .filter(|w| w[0] == flag && w[1] == value)
            .count()
    }

    #[test]
    fn literal_scenario_tokens() {
        let cmd = build(&config(NetMode::User), &tools()).unwrap();
        let args = &cmd.args;

        assert_eq!(count_pair(args, "-m", "8G"), 1);
        assert_eq!(count_pair(args, "-smp", "4"), 1);
        assert_eq!(
            count_pair(args, "-drive", r"file=D:\disk.qcow2,format=qcow2"),
            1
        );
        assert_eq!(count_pair(args, "-cdrom", r"C:\win.iso"), 1);
        assert_eq!(count_pair(args, "-netdev", "user,id=net0"), 1);
        assert_eq!(count_pair(args, "-device", "e1000,netdev=net0"), 1);
    }

    #[test]
    fn user_mode_never_emits_bridge_tokens() {
        let cmd = build(&config(NetMode::User), &tools()).unwrap();
        assert_eq!(count(&cmd.args, "bridge,id=net0"), 0);
        assert_eq!(count(&cmd.args, "user,id=net0"), 1);
    }

    #[test]
    fn bridge_mode_never_emits_user_tokens() {
        let cmd = build(&config(NetMode::Bridge), &tools()).unwrap();
        assert_eq!(count(&cmd.args, "user,id=net0"), 0);
        assert_eq!(count(&cmd.args, "bridge,id=net0"), 1);
        // Same NIC model in both modes.
        assert_eq!(count(&cmd.args, "e1000,netdev=net0"), 1);
    }

    #[test]
    fn boot_order_prefers_cdrom() {
        let cmd = build(&config(NetMode::User), &tools()).unwrap();
        assert_eq!(count_pair(&cmd.args, "-boot", "order=d"), 1);
    }

    #[test]
    fn malformed_ram_fails_before_assembly() {
        let mut bad = config(NetMode::User);
        bad.ram = "lots".into();
        assert!(matches!(
            build(&bad, &tools()),
            Err(WinupError::Config { .. })
        ));
    }

    #[test]
    fn zero_cpus_fails() {
        let mut bad = config(NetMode::User);
        bad.cpus = 0;
        assert!(build(&bad, &tools()).is_err());
    }

    #[test]
    fn display_line_starts_with_program() {
        let cmd = build(&config(NetMode::User), &tools()).unwrap();
        let line = cmd.display_line();
        assert!(line.starts_with("qemu-system-x86_64 -m 8G"));
    }
}
