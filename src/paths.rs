use std::path::PathBuf;

/// Fixed default disk filename, relative to the working directory.
pub const DEFAULT_DISK_NAME: &str = "win11_vm.qcow2";

/// ISO download cache: `~/.cache/winup/iso/` (platform equivalent).
pub fn download_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("winup")
        .join("iso")
}

/// Default disk image path in the current working directory.
pub fn default_disk_path() -> PathBuf {
    PathBuf::from(DEFAULT_DISK_NAME)
}
