//! Configuration loading, validation, and management for SketchTrace.
//!
//! Loads configuration from `~/.sketchtrace/config.toml` with environment
//! variable overrides. The relay's two required settings, the ingest write
//! key and the dataset name, normally come from the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sketchtrace/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relay HTTP server settings
    #[serde(default)]
    pub relay: RelayConfig,

    /// Third-party ingestion API settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Client-side transport settings
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Path the relay endpoint is mounted on
    #[serde(default = "default_relay_path")]
    pub path: String,

    /// Allow binding to a non-loopback address
    #[serde(default)]
    pub allow_public_bind: bool,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_relay_path() -> String {
    "/api/telemetry".into()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            path: default_relay_path(),
            allow_public_bind: false,
        }
    }
}

impl RelayConfig {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn is_loopback(&self) -> bool {
        matches!(self.host.as_str(), "127.0.0.1" | "localhost" | "::1")
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL of the events API; the dataset is appended as a path segment
    #[serde(default = "default_ingest_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_key: Option<String>,
}

fn default_ingest_url() -> String {
    "https://api.honeycomb.io/1/events".into()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: default_ingest_url(),
            dataset: None,
            write_key: None,
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("api_url", &self.api_url)
            .field("dataset", &self.dataset)
            .field("write_key", &redact(&self.write_key))
            .finish()
    }
}

/// The settings the relay cannot start without.
#[derive(Clone)]
pub struct IngestCredentials {
    pub api_url: String,
    pub dataset: String,
    pub write_key: String,
}

impl std::fmt::Debug for IngestCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestCredentials")
            .field("api_url", &self.api_url)
            .field("dataset", &self.dataset)
            .field("write_key", &"[REDACTED]")
            .finish()
    }
}

impl IngestCredentials {
    /// Full event endpoint: `{api_url}/{dataset}`.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), self.dataset)
    }
}

impl IngestConfig {
    /// Resolve the required settings, failing on the first one missing.
    pub fn credentials(&self) -> Result<IngestCredentials, ConfigError> {
        let write_key = non_empty(&self.write_key).ok_or(ConfigError::MissingSetting {
            name: "ingest.write_key",
            env: WRITE_KEY_VARS[0],
        })?;
        let dataset = non_empty(&self.dataset).ok_or(ConfigError::MissingSetting {
            name: "ingest.dataset",
            env: DATASET_VARS[0],
        })?;
        Ok(IngestCredentials {
            api_url: self.api_url.clone(),
            dataset,
            write_key,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Where the client transport POSTs events
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
}

fn default_relay_url() -> String {
    format!("http://{}:{}{}", default_host(), default_port(), default_relay_path())
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
        }
    }
}

/// Environment variables for the write key, highest priority first.
pub const WRITE_KEY_VARS: [&str; 2] = ["SKETCHTRACE_WRITE_KEY", "HONEYCOMB_WRITE_KEY"];
/// Environment variables for the dataset name, highest priority first.
pub const DATASET_VARS: [&str; 2] = ["SKETCHTRACE_DATASET", "HONEYCOMB_DATASET"];
/// Environment variable overriding the client relay URL.
pub const RELAY_URL_VAR: &str = "SKETCHTRACE_RELAY_URL";

impl AppConfig {
    /// Load configuration from the default path (~/.sketchtrace/config.toml).
    ///
    /// Environment variables override file values:
    /// - `SKETCHTRACE_WRITE_KEY` / `HONEYCOMB_WRITE_KEY`
    /// - `SKETCHTRACE_DATASET` / `HONEYCOMB_DATASET`
    /// - `SKETCHTRACE_RELAY_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| names.iter().find_map(|name| lookup(name));

        if let Some(key) = first(&WRITE_KEY_VARS[..]) {
            self.ingest.write_key = Some(key);
        }
        if let Some(dataset) = first(&DATASET_VARS[..]) {
            self.ingest.dataset = Some(dataset);
        }
        if let Some(url) = lookup(RELAY_URL_VAR) {
            self.client.relay_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sketchtrace")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.relay.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "relay.path must start with '/'".into(),
            ));
        }

        if !self.relay.allow_public_bind && !self.relay.is_loopback() {
            return Err(ConfigError::ValidationError(format!(
                "relay.host {} is not a loopback address; set relay.allow_public_bind = true",
                self.relay.host
            )));
        }

        if !self.ingest.api_url.starts_with("http://") && !self.ingest.api_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "ingest.api_url must start with http:// or https://".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required setting {name} (set {env})")]
    MissingSetting {
        name: &'static str,
        env: &'static str,
    },
}
