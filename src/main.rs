//! kubemerger - merged kubeconfig daemon
//!
//! Watches a directory (default `~/.kube`) and rewrites a single merged
//! kubeconfig whenever any kubeconfig below it changes.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use kubemerger::config::{manager::ENV_LOG_LEVEL, ConfigManager};
use kubemerger::{Daemon, ShutdownCoordinator};

/// CLI arguments for kubemerger
#[derive(Parser, Debug)]
#[command(name = "kubemerger")]
#[command(about = "Watch a directory of kubeconfigs and keep one merged kubeconfig")]
#[command(version)]
#[command(long_about = "
kubemerger watches a directory tree recursively and merges every kubeconfig
found in it into a single kubeconfig. Cluster, user and context names are
prefixed with the name of the file they come from and made unique.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  KUBEMERGER_ROOT_DIR   - Directory to watch recursively
  KUBEMERGER_OUTPUT     - Merged kubeconfig path
  KUBEMERGER_DEBOUNCE   - Quiet period before merging (e.g. 300ms, 1s)
  KUBEMERGER_LOG_LEVEL  - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    /// Directory to watch (overrides config file)
    #[arg(short, long, help = "The directory to watch recursively")]
    pub root_dir: Option<PathBuf>,

    /// Output path (overrides config file)
    #[arg(short, long, help = "The output kubeconfig path")]
    pub output: Option<PathBuf>,

    /// Additional paths to exclude
    #[arg(short, long, help = "Path to exclude from watching (repeatable)")]
    pub exclude: Vec<PathBuf>,

    /// Debounce delay
    #[arg(long, value_parser = humantime::parse_duration, help = "Quiet period before merging (e.g. 300ms)")]
    pub debounce: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Merge once and exit
    #[arg(long, help = "Merge once and exit without watching")]
    pub once: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Some("debug")
    } else {
        args.log_level.as_deref()
    };

    let env_log_level = std::env::var(ENV_LOG_LEVEL).ok();
    let log_filter = init_tracing(&startup_log_level(log_level, env_log_level.as_deref()));

    let config_path = args
        .config
        .clone()
        .or_else(ConfigManager::default_config_path);

    let mut config = match &config_path {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => kubemerger::Config::default(),
    };
    ConfigManager::apply_env(&mut config)?;

    config.merge_with_cli_args(
        args.root_dir.as_deref(),
        args.output.as_deref(),
        &args.exclude,
        args.debounce,
        log_level,
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    // The config file may only now have supplied the level
    if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
        if let Err(e) = log_filter.reload(EnvFilter::new(&config.logging.level)) {
            error!("Failed to apply log level {}: {}", config.logging.level, e);
        }
    }

    info!("Starting kubemerger v{}", env!("CARGO_PKG_VERSION"));

    let daemon = Daemon::new(&config);

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Root dir: {}", daemon.root().display());
        info!("  Output: {}", daemon.output().display());
        info!("  Excluded: {:?}", daemon.exclusions());
        info!("  Debounce: {:?}", config.watch.debounce);
        return Ok(());
    }

    if args.once {
        let count = daemon.sync_once()?;
        info!("Merged {} files into {}", count, daemon.output().display());
        return Ok(());
    }

    let shutdown_coordinator = ShutdownCoordinator::new();
    let shutdown_rx = shutdown_coordinator.subscribe();

    let mut daemon_handle = tokio::spawn(async move { daemon.run(shutdown_rx).await });

    tokio::select! {
        result = &mut daemon_handle => {
            // The daemon only returns on its own if the watcher could not start
            return result.context("Daemon task failed")?;
        }
        result = shutdown_coordinator.listen_for_signals() => {
            if let Err(e) = result {
                error!("Error setting up signal handlers: {}", e);
                shutdown_coordinator.trigger();
            }
        }
    }

    match daemon_handle.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!("Daemon task failed: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Level used until the configuration file has been read
fn startup_log_level(cli_level: Option<&str>, env_level: Option<&str>) -> String {
    cli_level.or(env_level).unwrap_or("info").to_string()
}

/// Initialize tracing/logging; the returned handle swaps the level filter
fn init_tracing(log_level: &str) -> reload::Handle<EnvFilter, Registry> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let (filter, handle) = reload::Layer::new(env_filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true),
        )
        .init();

    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_log_level_precedence() {
        assert_eq!(startup_log_level(Some("debug"), Some("warn")), "debug");
        assert_eq!(startup_log_level(None, Some("warn")), "warn");
        assert_eq!(startup_log_level(None, None), "info");
    }

    #[test]
    fn test_verbose_flag_parses() {
        let args = CliArgs::try_parse_from(["kubemerger", "-v", "--debounce", "1s"]).unwrap();
        assert!(args.verbose);
        assert_eq!(args.debounce, Some(Duration::from_secs(1)));
    }
}
