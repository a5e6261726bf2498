//! Merge Daemon
//!
//! Wires the path watcher to the merger: every emitted batch of files is
//! merged, serialized and written to the output path. Merge and write
//! failures are logged and never stop the watch loop.

use crate::config::Config;
use crate::kubeconfig;
use crate::merge::merge_files;
use crate::paths::expand_home;
use crate::watcher::{self, PathWatcher};
use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Keeps the merged kubeconfig in sync with a watched directory
pub struct Daemon {
    root: PathBuf,
    output: PathBuf,
    exclusions: Vec<PathBuf>,
    debounce: Duration,
    shutdown_timeout: Duration,
}

impl Daemon {
    /// Create a daemon from configuration, expanding `~` in every path
    pub fn new(config: &Config) -> Self {
        let output = expand_home(&config.watch.output);
        let mut exclusions: Vec<PathBuf> = config
            .watch
            .exclude
            .iter()
            .map(|path| expand_home(path))
            .collect();
        // Never feed our own output back into the merge
        exclusions.push(output.clone());

        Self {
            root: expand_home(&config.watch.root_dir),
            output,
            exclusions,
            debounce: config.watch.debounce,
            shutdown_timeout: config.watch.shutdown_timeout,
        }
    }

    /// Watched directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Merged kubeconfig path
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Paths never watched or merged, output included
    pub fn exclusions(&self) -> &[PathBuf] {
        &self.exclusions
    }

    /// Watch until a shutdown signal arrives.
    ///
    /// Fails only if the watcher cannot be started.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let mut watcher =
            PathWatcher::start_with_delay(&self.root, self.exclusions.clone(), self.debounce)
                .with_context(|| format!("Failed to start watching {}", self.root.display()))?;

        info!("Initial sync of {} files", watcher.initial_files().len());
        self.sync_logged(watcher.initial_files());

        loop {
            tokio::select! {
                batch = watcher.batches.recv() => match batch {
                    Some(files) => {
                        info!("Updated files: {}", files.len());
                        debug!("Files: {:?}", files);
                        self.sync_logged(&files);
                    }
                    None => {
                        warn!("Watcher stopped unexpectedly");
                        break;
                    }
                },
                Some(err) = watcher.errors.recv() => {
                    warn!("Watcher error: {}", err);
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown requested, stopping watcher");
                    break;
                }
            }
        }

        if tokio::time::timeout(self.shutdown_timeout, watcher.stop())
            .await
            .is_err()
        {
            warn!(
                "Watcher did not stop within {:?}",
                self.shutdown_timeout
            );
        }

        info!("Daemon stopped");
        Ok(())
    }

    /// Walk the tree once, without watching, and write the merged output.
    ///
    /// Returns the number of merged files.
    pub fn sync_once(&self) -> Result<usize> {
        let files = watcher::scan(&self.root, &self.exclusions)
            .with_context(|| format!("Failed to scan {}", self.root.display()))?;

        self.sync_files(&files)?;
        Ok(files.len())
    }

    /// Merge `files` (in the given order) and write the result to the output
    pub fn sync_files(&self, files: &[PathBuf]) -> Result<()> {
        let merged = merge_files(files)?;

        let data = kubeconfig::serialize_merged(&merged)
            .context("Failed to serialize merged kubeconfig")?;

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(&self.output, data)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        info!(
            "Wrote {} ({} clusters, {} users, {} contexts, current-context: {:?})",
            self.output.display(),
            merged.clusters.len(),
            merged.auth_infos.len(),
            merged.contexts.len(),
            merged.current_context
        );
        Ok(())
    }

    fn sync_logged(&self, files: &[PathBuf]) {
        if let Err(e) = self.sync_files(files) {
            error!("Error merging into {}: {:#}", self.output.display(), e);
        }
    }
}
