//! Configuration Types

use crate::paths::{default_ignore_paths, DEFAULT_KUBE_CONFIG, DEFAULT_KUBE_DIR};
use crate::watcher::DEFAULT_DEBOUNCE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchConfig,
    pub logging: LoggingConfig,
}

/// What to watch and where to write
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory watched recursively
    pub root_dir: PathBuf,
    /// Merged kubeconfig path; always excluded from watching
    pub output: PathBuf,
    /// Paths that are never walked, watched or merged
    pub exclude: Vec<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_KUBE_DIR),
            output: PathBuf::from(DEFAULT_KUBE_CONFIG),
            exclude: default_ignore_paths(),
            debounce: DEFAULT_DEBOUNCE,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
