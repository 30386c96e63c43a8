use crate::error::{AgentError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Primary config location, relative to the working directory.
pub const PRIMARY_CONFIG_PATH: &str = "config/agent.json";

#[cfg(windows)]
pub const SECONDARY_CONFIG_PATH: &str = r"C:\ProgramData\hostmon\agent.json";
#[cfg(not(windows))]
pub const SECONDARY_CONFIG_PATH: &str = "/etc/hostmon/agent.json";

#[cfg(windows)]
pub const DEFAULT_STREAM_ENDPOINT: &str = r"\\.\pipe\hostmon";
#[cfg(not(windows))]
pub const DEFAULT_STREAM_ENDPOINT: &str = "/tmp/hostmon.sock";

/// Agent settings, loaded once at startup and never reloaded.
///
/// Every field is optional in the file; an absent file yields
/// [`AppConfig::default`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_log_type")]
    pub log_type: String,
    /// Loki push endpoint, e.g. `http://loki:3100/loki/api/v1/push`.
    #[serde(default)]
    pub loki_url: Option<String>,
    /// Push gateway base URL; job/instance segments are appended.
    #[serde(default)]
    pub push_gateway_url_base: Option<String>,
    /// Report the logical-processor CPU view instead of the host total.
    #[serde(default)]
    pub hyper_v: bool,
    #[serde(default = "default_job")]
    pub job: String,
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_staging_path")]
    pub staging_path: PathBuf,
    #[serde(default = "default_stream_endpoint")]
    pub stream_endpoint: String,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_client() -> String {
    "default".to_string()
}

fn default_region() -> String {
    "local".to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_component() -> String {
    "hostmon-agent".to_string()
}

fn default_log_type() -> String {
    "system_metrics".to_string()
}

fn default_job() -> String {
    "host_metrics".to_string()
}

fn default_sample_interval() -> u64 {
    2
}

fn default_flush_interval() -> u64 {
    10
}

fn default_staging_path() -> PathBuf {
    PathBuf::from("metrics_staging.log")
}

fn default_stream_endpoint() -> String {
    DEFAULT_STREAM_ENDPOINT.to_string()
}

fn default_buffer_capacity() -> usize {
    10_000
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: default_client(),
            region: default_region(),
            environment: default_environment(),
            component: default_component(),
            log_type: default_log_type(),
            loki_url: None,
            push_gateway_url_base: None,
            hyper_v: false,
            job: default_job(),
            sample_interval_secs: default_sample_interval(),
            flush_interval_secs: default_flush_interval(),
            staging_path: default_staging_path(),
            stream_endpoint: default_stream_endpoint(),
            buffer_capacity: default_buffer_capacity(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl AppConfig {
    /// Loads from `explicit` if given, else the primary path, else the
    /// secondary path. Falls back to defaults on any failure.
    pub fn load(explicit: Option<&Path>) -> Self {
        let mut candidates = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        candidates.push(PathBuf::from(PRIMARY_CONFIG_PATH));
        candidates.push(PathBuf::from(SECONDARY_CONFIG_PATH));
        Self::load_first(&candidates)
    }

    /// The first existing candidate wins; a parse failure there keeps the
    /// defaults rather than trying later candidates.
    pub fn load_first(candidates: &[PathBuf]) -> Self {
        let Some(path) = candidates.iter().find(|p| p.is_file()) else {
            tracing::warn!(
                searched = ?candidates,
                "No config file found, using defaults"
            );
            return Self::default();
        };

        match Self::from_file(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(error = %e, "Config load failed, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AgentError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| AgentError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(config.normalized())
    }

    /// Blank endpoints become unset and zero tunables fall back to defaults.
    fn normalized(mut self) -> Self {
        let defaults = Self::default();
        self.loki_url = non_blank(self.loki_url);
        self.push_gateway_url_base = non_blank(self.push_gateway_url_base);
        if self.sample_interval_secs == 0 {
            self.sample_interval_secs = defaults.sample_interval_secs;
        }
        if self.flush_interval_secs == 0 {
            self.flush_interval_secs = defaults.flush_interval_secs;
        }
        if self.buffer_capacity == 0 {
            self.buffer_capacity = defaults.buffer_capacity;
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = defaults.http_timeout_secs;
        }
        if self.stream_endpoint.trim().is_empty() {
            self.stream_endpoint = defaults.stream_endpoint;
        }
        if self.job.trim().is_empty() {
            self.job = defaults.job;
        }
        self
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
