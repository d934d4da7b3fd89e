//! Platform-specific directory utilities

use std::path::PathBuf;

/// Get the platform-specific log directory for simulation runs
///
/// Follows platform conventions:
/// - macOS: `~/Library/Caches/experience/logs`
/// - Linux: `~/.cache/experience/logs` (or `$XDG_CACHE_HOME/experience/logs`)
/// - Windows: `%LOCALAPPDATA%\experience\logs`
/// - Fallback: `/tmp/experience/logs`
pub fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "experience")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/experience"))
        .join("logs")
}

/// Default content directory: `EXPERIENCE_DATA_DIR`, else `./data`.
pub fn default_data_dir() -> PathBuf {
    std::env::var_os("EXPERIENCE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"))
}
