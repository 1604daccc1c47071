use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::awaiter::{PollSettings, DEFAULT_DESCRIPTION};

const ENV_PREFIX: &str = "ROUTEOPT_";

/// Polling defaults shared by a test run, loadable from TOML and the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwaitConfig {
    pub condition_description: String,
    pub condition_timeout_secs: u64,
    pub condition_retry_interval_ms: u64,
    pub operation_hard_cap_secs: u64,
    pub operation_poll_interval_ms: u64,
    pub log_level: String,
}

impl Default for AwaitConfig {
    fn default() -> Self {
        Self {
            condition_description: DEFAULT_DESCRIPTION.to_string(),
            condition_timeout_secs: 600,
            condition_retry_interval_ms: 1000,
            operation_hard_cap_secs: 300,
            operation_poll_interval_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl AwaitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.condition_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "condition_timeout_secs must be greater than 0"
            ));
        }

        if self.condition_retry_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "condition_retry_interval_ms must be greater than 0"
            ));
        }

        if self.operation_hard_cap_secs == 0 {
            return Err(anyhow::anyhow!(
                "operation_hard_cap_secs must be greater than 0"
            ));
        }

        if self.operation_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "operation_poll_interval_ms must be greater than 0"
            ));
        }

        if self.condition_retry_interval() > self.condition_timeout() {
            log::warn!(
                "condition_retry_interval_ms ({}) exceeds condition_timeout_secs ({}), conditions get a single check",
                self.condition_retry_interval_ms,
                self.condition_timeout_secs
            );
        }

        Ok(())
    }

    pub fn condition_timeout(&self) -> Duration {
        Duration::from_secs(self.condition_timeout_secs)
    }

    pub fn condition_retry_interval(&self) -> Duration {
        Duration::from_millis(self.condition_retry_interval_ms)
    }

    pub fn operation_hard_cap(&self) -> Duration {
        Duration::from_secs(self.operation_hard_cap_secs)
    }

    pub fn operation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.operation_poll_interval_ms)
    }

    /// Condition defaults as builder settings.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            description: self.condition_description.clone(),
            timeout: self.condition_timeout(),
            retry_interval: self.condition_retry_interval(),
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `ROUTEOPT_*` overrides from `lookup`. Unparsable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let number = |name: &str| {
            var(name).and_then(|raw| match raw.parse::<u64>() {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("Ignoring {ENV_PREFIX}{name}={raw}: {e}");
                    None
                }
            })
        };

        if let Some(description) = var("CONDITION_DESCRIPTION") {
            self.condition_description = description;
        }

        if let Some(timeout) = number("CONDITION_TIMEOUT_SECS") {
            self.condition_timeout_secs = timeout;
        }

        if let Some(interval) = number("CONDITION_RETRY_INTERVAL_MS") {
            self.condition_retry_interval_ms = interval;
        }

        if let Some(cap) = number("OPERATION_HARD_CAP_SECS") {
            self.operation_hard_cap_secs = cap;
        }

        if let Some(interval) = number("OPERATION_POLL_INTERVAL_MS") {
            self.operation_poll_interval_ms = interval;
        }

        if let Some(log_level) = var("LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Initialize `env_logger` at `log_level` unless `RUST_LOG` is set.
    ///
    /// Safe to call more than once; only the first call installs a logger.
    pub fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        if env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .try_init()
            .is_err()
        {
            log::trace!("Logger already initialized");
        }
    }
}

/// Load configuration: env vars > config file > defaults
pub fn load_config(config_path: Option<&str>) -> Result<AwaitConfig> {
    let mut config = AwaitConfig::default();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            let file_content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;

            config = toml::from_str(&file_content)
                .with_context(|| format!("Failed to parse config file: {path}"))?;

            log::info!("Loaded configuration from file: {path}");
        } else {
            log::info!("Config file not found: {path}, using defaults");
        }
    }

    config.apply_env_overrides();

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;

    log::debug!("Final config: {config:?}");

    Ok(config)
}

/// Write the default configuration to `path` as TOML
pub fn create_sample_config(path: &str) -> Result<()> {
    let config = AwaitConfig::default();
    let toml_content =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    fs::write(path, toml_content)
        .with_context(|| format!("Failed to write sample config to: {path}"))?;

    log::info!("Sample configuration written to: {path}");
    Ok(())
}
