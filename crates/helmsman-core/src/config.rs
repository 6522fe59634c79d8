//! Controller configuration: TOML file + environment overrides.
//!
//! Missing file → defaults. Unknown keys are rejected so that typos surface
//! at startup instead of silently falling back to a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::domain::RetryPolicy;

pub const DEFAULT_CHART: &str =
    "https://catalinpredica.github.io/k8s-assistant/charts/k8s-assistant";

pub const ENV_WORKERS: &str = "HELMSMAN_WORKERS";
pub const ENV_CHART: &str = "HELMSMAN_CHART";
pub const ENV_NAMESPACE: &str = "HELMSMAN_NAMESPACE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// 同時に走る reconcile の上限
    pub workers: usize,
    pub retry: RetryConfig,
    pub release: ReleaseConfig,
    pub watch: WatchConfig,
    pub log: LogConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            retry: RetryConfig::default(),
            release: ReleaseConfig::default(),
            watch: WatchConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            multiplier: 2.0,
            max_delay_ms: 300_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.base_delay_ms),
            self.multiplier,
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    pub chart: String,
    pub helm_bin: String,
    /// Passed to helm as `--timeout {n}s`.
    pub timeout_secs: Option<u64>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            chart: DEFAULT_CHART.to_string(),
            helm_bin: "helm".to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// None = all namespaces
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl ControllerConfig {
    /// Load from `path` (if given and present), then apply process env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                debug!(path = ?path, len = content.len(), "config.read");
                Self::from_toml_str(&content)?
            }
            _ => {
                debug!(path = ?path, "config.defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// `lookup` は環境変数の読み出し（テストでは差し替え）。空文字は未設定扱い。
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(value) = get(ENV_WORKERS) {
            self.workers = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_WORKERS,
                value: value.clone(),
            })?;
        }
        if let Some(chart) = get(ENV_CHART) {
            self.release.chart = chart;
        }
        if let Some(namespace) = get(ENV_NAMESPACE) {
            self.watch.namespace = Some(namespace);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "retry.multiplier must be >= 1.0".into(),
            ));
        }
        if self.release.chart.is_empty() {
            return Err(ConfigError::Invalid("release.chart must not be empty".into()));
        }
        Ok(())
    }
}
