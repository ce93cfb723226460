use clap::Parser;
use std::path::PathBuf;

use crate::config::NetMode;

#[derive(Parser, Debug)]
#[command(name = "winup", about = "Unattended Windows 11 VM provisioning with QEMU")]
pub struct Cli {
    /// RAM size for the guest (e.g. 8G or 4096M)
    #[arg(long)]
    pub ram: String,

    /// Virtual disk size in gigabytes
    #[arg(long, default_value_t = 60)]
    pub disk_size: u32,

    /// Number of guest CPU cores
    #[arg(long, default_value_t = 4)]
    pub cpus: u32,

    /// Path to a Windows 11 ISO (downloaded automatically if not set)
    #[arg(long)]
    pub iso: Option<PathBuf>,

    /// Path to the qcow2 disk image (default: win11_vm.qcow2 in the working directory)
    #[arg(long)]
    pub disk_image: Option<PathBuf>,

    /// Guest networking mode
    #[arg(long, value_enum, default_value_t = NetMode::User)]
    pub net: NetMode,

    /// Directory for downloaded ISOs (default: the user cache directory)
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
