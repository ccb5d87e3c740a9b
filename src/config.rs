use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("GitHub token required; set github.token in .revertomatic.toml or the GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Invalid unoverridable suffix pattern: {0}")]
    Denylist(#[from] regex::Error),

    #[error("Invalid [fork] back-off setting: {0}")]
    Backoff(String),
}

/// Top-level configuration loaded from .revertomatic.toml.
/// All fields are optional — the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub statuses: StatusConfig,

    #[serde(default)]
    pub fork: ForkConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// REST API root, e.g. `https://github.example.com/api/v3` for Enterprise.
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Job-name suffixes that must never be overridden.
    #[serde(default = "default_unoverridable_suffixes")]
    pub unoverridable_suffixes: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            unoverridable_suffixes: default_unoverridable_suffixes(),
        }
    }
}

fn default_unoverridable_suffixes() -> Vec<String> {
    crate::status::DEFAULT_UNOVERRIDABLE_SUFFIXES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Back-off used while waiting for a freshly requested fork to appear.
#[derive(Debug, Clone, Deserialize)]
pub struct ForkConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            factor: default_factor(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    crate::retry::DEFAULT_MAX_ATTEMPTS
}

fn default_initial_delay_ms() -> u64 {
    crate::retry::DEFAULT_INITIAL_DELAY.as_millis() as u64
}

fn default_factor() -> f64 {
    crate::retry::DEFAULT_FACTOR
}

fn default_jitter() -> f64 {
    crate::retry::DEFAULT_JITTER
}

impl ForkConfig {
    /// Checked conversion into a retry policy. `factor` must be finite and at
    /// least 1; `jitter` must lie in `[0, 1]`.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::Backoff(format!(
                "factor must be a finite number >= 1, got {}",
                self.factor
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Backoff(format!(
                "jitter must be between 0 and 1, got {}",
                self.jitter
            )));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            factor: self.factor,
            jitter: self.jitter,
        })
    }
}

impl Config {
    /// Load configuration from .revertomatic.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".revertomatic.toml");
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var. Empty values count as absent.
    pub fn github_token(&self) -> Result<String, ConfigError> {
        self.token_with_env(std::env::var("GITHUB_TOKEN").ok())
    }

    fn token_with_env(&self, env_token: Option<String>) -> Result<String, ConfigError> {
        let present = |token: &String| !token.trim().is_empty();
        self.github
            .token
            .clone()
            .filter(present)
            .or_else(|| env_token.filter(present))
            .ok_or(ConfigError::MissingToken)
    }

    pub fn api_base(&self) -> &str {
        self.github
            .api_base
            .as_deref()
            .unwrap_or(crate::github::DEFAULT_API_BASE)
    }
}
