//! Configuration Manager

use super::Config;
use crate::paths::expand_home;
use crate::watcher::normalize;
use crate::Result;
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `watch.root_dir`
pub const ENV_ROOT_DIR: &str = "KUBEMERGER_ROOT_DIR";
/// Environment variable overriding `watch.output`
pub const ENV_OUTPUT: &str = "KUBEMERGER_OUTPUT";
/// Environment variable overriding `watch.debounce` (e.g. `500ms`)
pub const ENV_DEBOUNCE: &str = "KUBEMERGER_DEBOUNCE";
/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "KUBEMERGER_LOG_LEVEL";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
    }

    /// Apply `KUBEMERGER_*` environment variables on top of `config`
    pub fn apply_env(config: &mut Config) -> Result<()> {
        Self::apply_vars(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_vars<F>(config: &mut Config, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root_dir) = lookup(ENV_ROOT_DIR) {
            config.watch.root_dir = PathBuf::from(root_dir);
        }

        if let Some(output) = lookup(ENV_OUTPUT) {
            config.watch.output = PathBuf::from(output);
        }

        if let Some(debounce) = lookup(ENV_DEBOUNCE) {
            config.watch.debounce = humantime::parse_duration(&debounce)
                .with_context(|| format!("Invalid {}: {}", ENV_DEBOUNCE, debounce))?;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }

        Ok(())
    }

    /// Default location of the configuration file
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kubemerger").join("config.toml"))
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_watch_config()
            .with_context(|| "Watch configuration validation failed")?;

        self.validate_logging_config()
            .with_context(|| "Logging configuration validation failed")?;

        Ok(())
    }

    fn validate_watch_config(&self) -> Result<()> {
        if self.watch.root_dir.as_os_str().is_empty() {
            bail!("root_dir must not be empty");
        }

        if self.watch.output.as_os_str().is_empty() {
            bail!("output must not be empty");
        }

        if normalize(&expand_home(&self.watch.output))
            == normalize(&expand_home(&self.watch.root_dir))
        {
            bail!("output must not be the watched root_dir");
        }

        if self.watch.debounce.is_zero() {
            bail!("debounce must be greater than 0");
        }

        if self.watch.debounce > Duration::from_secs(60) {
            bail!("debounce cannot exceed 1 minute");
        }

        Ok(())
    }

    fn validate_logging_config(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!("logging.level must be one of: {}", VALID_LOG_LEVELS.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        root_dir: Option<&Path>,
        output: Option<&Path>,
        exclude: &[PathBuf],
        debounce: Option<Duration>,
        log_level: Option<&str>,
    ) {
        if let Some(root_dir) = root_dir {
            self.watch.root_dir = root_dir.to_path_buf();
            tracing::info!("CLI override: root dir set to {}", root_dir.display());
        }

        if let Some(output) = output {
            self.watch.output = output.to_path_buf();
            tracing::info!("CLI override: output set to {}", output.display());
        }

        if !exclude.is_empty() {
            self.watch.exclude.extend(exclude.iter().cloned());
            tracing::info!("CLI override: {} extra exclusions", exclude.len());
        }

        if let Some(debounce) = debounce {
            self.watch.debounce = debounce;
            tracing::info!("CLI override: debounce set to {:?}", debounce);
        }

        if let Some(level) = log_level {
            self.logging.level = level.to_string();
        }
    }
}
