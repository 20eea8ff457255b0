use std::time::Duration;

use halyard_transport::Backoff;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_PATH: &str = "https://monitoring.googleapis.com/v3/";

fn default_base_path() -> String {
    DEFAULT_BASE_PATH.to_string()
}

fn default_user_agent() -> String {
    concat!("halyard/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Client configuration shared by every apply, get, list and delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Per-call timeout in seconds. Zero means no timeout.
    #[serde(default)]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Delay between delete confirmation polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Project used when a manifest does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            timeout_secs: 0,
            user_agent: default_user_agent(),
            retry: RetrySettings::default(),
            poll_interval_ms: default_poll_interval_ms(),
            project: None,
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Config {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Apply `HALYARD_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Unparseable numbers are logged and
    /// ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup("HALYARD_BASE_PATH") {
            self.base_path = base;
        }
        if let Some(raw) = lookup("HALYARD_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring HALYARD_TIMEOUT_SECS"),
            }
        }
        if let Some(project) = lookup("HALYARD_PROJECT") {
            self.project = Some(project);
        }
        if let Some(token) = lookup("HALYARD_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        self
    }
}
