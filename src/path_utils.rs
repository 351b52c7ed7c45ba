//! Path utilities for remote operations
//!
//! Remote paths always use `/` regardless of the local or remote OS.
//! Local paths (savedir targets) use the platform-native separator.

use std::path::PathBuf;

/// Combine a remote working directory and a file name into one remote path.
///
/// Exactly one `/` separates the directory from the file name, whether or
/// not `workdir` already ends with one or `filename` starts with one:
/// - `""` + `a.txt` → `a.txt`
/// - `/data` + `a.txt` → `/data/a.txt`
/// - `/data/` + `/a.txt` → `/data/a.txt`
/// - `/` + `a.txt` → `/a.txt`
pub fn resolve_remote_path(workdir: &str, filename: &str) -> String {
    if workdir.is_empty() {
        return filename.to_string();
    }

    let dir = workdir.trim_end_matches('/');
    let name = filename.trim_start_matches('/');

    format!("{}/{}", dir, name)
}

/// Join local path components using the platform-native separator.
pub fn join_local_path(base: &str, component: &str) -> PathBuf {
    let mut path = PathBuf::from(base);
    path.push(component);
    path
}
