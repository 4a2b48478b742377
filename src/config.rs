//! Client configuration from the environment

use std::time::Duration;
use thiserror::Error;

const DEFAULT_ASSISTANT_ID: &str = "agent";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_STREAM_MODES: &[&str] = &["values", "custom"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Configuration for the run-stream client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:2024`
    pub api_url: Option<String>,
    /// Static bearer token for the default identity provider
    pub api_token: Option<String>,
    /// Graph / workflow the runs execute
    pub assistant_id: String,
    pub request_timeout: Duration,
    pub stream_modes: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            stream_modes: DEFAULT_STREAM_MODES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; used by `from_env` and tests
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let request_timeout = match lookup("HITL_REQUEST_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    name: "HITL_REQUEST_TIMEOUT_SECS",
                    value,
                })?,
            None => defaults.request_timeout,
        };

        let stream_modes = lookup("HITL_STREAM_MODES")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|mode| !mode.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|modes| !modes.is_empty())
            .unwrap_or(defaults.stream_modes);

        Ok(Self {
            api_url: lookup("HITL_API_URL").filter(|url| !url.trim().is_empty()),
            api_token: lookup("HITL_API_TOKEN"),
            assistant_id: lookup("HITL_ASSISTANT_ID").unwrap_or(defaults.assistant_id),
            request_timeout,
            stream_modes,
        })
    }

    pub fn require_api_url(&self) -> Result<&str, ConfigError> {
        self.api_url
            .as_deref()
            .ok_or(ConfigError::Missing("HITL_API_URL"))
    }
}
