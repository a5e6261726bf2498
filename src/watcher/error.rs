//! Watcher Errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the path watcher.
///
/// Returned from [`PathWatcher::start`](super::PathWatcher::start) they are
/// fatal; after startup they are delivered on the error stream and the
/// watcher keeps running.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize file watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to watch directory {path}: {source}")]
    Subscribe {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("File watcher error: {0}")]
    Runtime(#[from] notify::Error),
}
