//! Path Helpers

use std::path::{Path, PathBuf};

/// Directory watched when nothing else is configured
pub const DEFAULT_KUBE_DIR: &str = "~/.kube";

/// Merged output written when nothing else is configured
pub const DEFAULT_KUBE_CONFIG: &str = "~/.kube/config";

/// kubectl's own caches; never kubeconfigs
pub const DEFAULT_IGNORE_PATHS: &[&str] = &["~/.kube/cache", "~/.kube/http-cache"];

/// Current user's home directory, falling back to `$HOME`
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().or_else(|| {
        std::env::var("HOME")
            .ok()
            .map(|home| home.trim().to_string())
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    })
}

/// Replace a leading `~` with the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Default exclusions as paths
pub fn default_ignore_paths() -> Vec<PathBuf> {
    DEFAULT_IGNORE_PATHS.iter().map(PathBuf::from).collect()
}
