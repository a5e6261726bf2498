//! kubemerger Library
//!
//! Watches a directory of kubeconfig files and keeps a single merged
//! kubeconfig up to date.
//!
//! The two core pieces are [`watcher::PathWatcher`], a recursive,
//! debounced directory watcher, and [`merge::merge_sources`], which merges
//! named kubeconfig documents into one with globally unique entity names.

pub mod config;
pub mod daemon;
pub mod kubeconfig;
pub mod merge;
pub mod paths;
pub mod shutdown;
pub mod watcher;

pub use config::Config;
pub use daemon::Daemon;
pub use merge::{merge_files, merge_sources, NamedSource};
pub use shutdown::ShutdownCoordinator;
pub use watcher::PathWatcher;

/// Common error type for the daemon
pub type Result<T> = anyhow::Result<T>;
