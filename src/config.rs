// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ct_log::RetryPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct LogListsConfig {
    /// URLs or file paths, applied in order
    #[serde(default = "default_log_list_sources")]
    pub sources: Vec<String>,
}

/// crt.sh and BIMI lists have no stable public URL; add them in `[log_lists]`
fn default_log_list_sources() -> Vec<String> {
    vec![
        "https://www.gstatic.com/ct/log_list/v3/all_logs_list.json".to_string(),
        "https://valid.apple.com/ct/log_list/current_log_list.json".to_string(),
    ]
}

impl Default for LogListsConfig {
    fn default() -> Self {
        Self {
            sources: default_log_list_sources(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_attempts() -> u32 { 5 }
fn default_retry_delay() -> u64 { 10 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_in_flight() -> usize { 32 }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            request_timeout_secs: default_request_timeout(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("accepted_roots")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub log_lists: LogListsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise defaults
    pub fn from_file_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch.max_attempts == 0 {
            anyhow::bail!("fetch.max_attempts must be greater than 0");
        }
        if self.fetch.max_in_flight == 0 {
            anyhow::bail!("fetch.max_in_flight must be greater than 0");
        }
        if self.log_lists.sources.is_empty() {
            anyhow::bail!("log_lists.sources must name at least one log list");
        }
        Ok(())
    }
}
