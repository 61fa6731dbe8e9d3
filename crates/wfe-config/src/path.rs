//! `~`-prefixed path expansion for user-supplied session config paths
//! (spec §6, "Environment variables consumed: HOME").
//!
//! Modeled on the teacher's `GlobalConfig::config_path` (which resolves a
//! user-level config file location); this crate's session config can be
//! loaded from a path the caller types with a literal `~`, so the
//! expansion needs to happen before the file is opened.

use std::path::{Path, PathBuf};

/// Expand a leading `~` or `~/...` to `$HOME`. Paths without a leading
/// `~`, or where `HOME` is unset, are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    let Some(rest) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };
    let Ok(home) = std::env::var("HOME") else {
        return PathBuf::from(path);
    };
    if rest.is_empty() {
        PathBuf::from(home)
    } else if let Some(rest) = rest.strip_prefix('/') {
        Path::new(&home).join(rest)
    } else {
        // Not a bare `~` or `~/...` (e.g. `~otheruser`): leave untouched.
        PathBuf::from(path)
    }
}
