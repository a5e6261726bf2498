//! Watch State
//!
//! The set of subscribed directories and known files, owned by the watch loop.

use super::{WatchError, WatchEvent};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Subscriptions and known files for one watcher instance
pub struct WatchState {
    watcher: RecommendedWatcher,
    exclusions: Vec<PathBuf>,
    directories: BTreeSet<PathBuf>,
    files: BTreeSet<PathBuf>,
}

impl WatchState {
    /// Create an empty state around an OS watcher
    pub fn new(watcher: RecommendedWatcher, exclusions: Vec<PathBuf>) -> Self {
        Self {
            watcher,
            exclusions,
            directories: BTreeSet::new(),
            files: BTreeSet::new(),
        }
    }

    /// True if `path` is an exclusion entry or lies below one
    pub fn is_excluded(&self, path: &Path) -> bool {
        is_excluded(&self.exclusions, path)
    }

    /// Subscribe `root` and every non-excluded directory below it, and
    /// register every non-excluded file found on the way.
    ///
    /// Stops at the first walk or subscription error; whatever was
    /// registered before the error stays registered.
    pub fn add_dir_recursive(&mut self, root: &Path) -> Result<(), WatchError> {
        let exclusions = self.exclusions.clone();
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(move |entry| !is_excluded(&exclusions, entry.path()));

        for entry in walker {
            let entry = entry.map_err(|e| walk_error(root, e))?;

            if entry.file_type().is_dir() {
                self.add_dir(entry.path())?;
            } else {
                self.files.insert(entry.into_path());
            }
        }

        Ok(())
    }

    fn add_dir(&mut self, path: &Path) -> Result<(), WatchError> {
        if self.directories.contains(path) {
            return Ok(());
        }

        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Subscribe {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!("Watching directory: {}", path.display());
        self.directories.insert(path.to_path_buf());
        Ok(())
    }

    /// Forget `path`. A subscribed directory is unsubscribed together with
    /// every directory and known file nested under it.
    pub fn remove_path(&mut self, path: &Path) {
        if self.directories.remove(path) {
            self.unwatch(path);

            let nested: Vec<PathBuf> = self
                .directories
                .iter()
                .filter(|dir| is_sub_path(path, dir))
                .cloned()
                .collect();
            for dir in nested {
                self.directories.remove(&dir);
                self.unwatch(&dir);
            }

            self.files.retain(|file| !is_sub_path(path, file));
        }

        self.files.remove(path);
    }

    fn unwatch(&mut self, path: &Path) {
        // The directory is usually gone already, so failures are expected
        if let Err(e) = self.watcher.unwatch(path) {
            debug!("Unwatch {} failed: {}", path.display(), e);
        }
    }

    /// Apply one filesystem event. Excluded paths and non-filesystem
    /// events leave the state untouched.
    pub fn apply(&mut self, event: &WatchEvent) -> Result<(), WatchError> {
        let Some(path) = event.path() else {
            return Ok(());
        };
        if self.is_excluded(path) {
            return Ok(());
        }

        match event {
            WatchEvent::Created(path) => match std::fs::metadata(path) {
                Ok(meta) if meta.is_dir() => self.add_dir_recursive(path)?,
                Ok(_) => {
                    self.files.insert(path.clone());
                }
                Err(_) => debug!("Created path vanished before it was seen: {}", path.display()),
            },
            WatchEvent::Removed(path) => self.remove_path(path),
            WatchEvent::Modified(path) => {
                if let Ok(meta) = std::fs::metadata(path) {
                    if !meta.is_dir() {
                        self.files.insert(path.clone());
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Known files minus exclusions, sorted
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .filter(|file| !self.is_excluded(file))
            .cloned()
            .collect()
    }

    /// Number of subscribed directories
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    /// True if `path` is currently subscribed
    pub fn is_subscribed(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }

    /// Drop every subscription and forget all known files
    pub fn release(&mut self) {
        for dir in std::mem::take(&mut self.directories) {
            if let Err(e) = self.watcher.unwatch(&dir) {
                warn!("Failed to release watch on {}: {}", dir.display(), e);
            }
        }
        self.files.clear();
    }
}

/// Every non-excluded file below `root`, sorted, without subscribing anything
pub fn scan(root: &Path, exclusions: &[PathBuf]) -> Result<Vec<PathBuf>, WatchError> {
    let root = normalize(root);
    let exclusions: Vec<PathBuf> = exclusions.iter().map(|p| normalize(p)).collect();
    let walker = WalkDir::new(&root)
        .into_iter()
        .filter_entry(|entry| !is_excluded(&exclusions, entry.path()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(&root, e))?;
        if !entry.file_type().is_dir() {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn walk_error(root: &Path, error: walkdir::Error) -> WatchError {
    WatchError::Walk {
        path: error
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf()),
        source: error,
    }
}

/// True if `path` equals an exclusion entry or is a descendant of one
pub fn is_excluded(exclusions: &[PathBuf], path: &Path) -> bool {
    exclusions
        .iter()
        .any(|exclusion| exclusion == path || is_sub_path(exclusion, path))
}

/// True if `child` is strictly below `parent`.
///
/// Purely lexical: `child` relative to `parent` must be non-empty and must
/// not climb out through `..`.
pub fn is_sub_path(parent: &Path, child: &Path) -> bool {
    match child.strip_prefix(parent) {
        Ok(rel) => {
            let mut components = rel.components().peekable();
            components.peek().is_some()
                && components.all(|c| !matches!(c, Component::ParentDir))
        }
        Err(_) => false,
    }
}

/// Make `path` absolute and drop `.`/`..` components lexically
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();

    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
