//! Backend connection settings.
//!
//! Loaded from the `[client]` table of the application TOML file. Every
//! field has a default, so an empty table (or no file at all) yields a
//! client pointed at a local development server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const API_URL_ENV: &str = "GHOST_NET_API_URL";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/api";
const DEFAULT_REPORTS_PATH: &str = "/reports";
const DEFAULT_STATUS_PATH: &str = "/reports/{id}/status";

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or has wrong types.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field parsed but holds an unusable value.
    #[error("Invalid config value for {field}: {message}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Connection settings for [`crate::HttpBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, e.g. `http://127.0.0.1:8080/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the report collection, relative to `base_url`.
    #[serde(default = "default_reports_path")]
    pub reports_path: String,
    /// Path template of the status endpoint; `{id}` is replaced by the
    /// report id.
    #[serde(default = "default_status_path")]
    pub status_path: String,
    /// Per-request timeout. Absent means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_reports_path() -> String {
    DEFAULT_REPORTS_PATH.to_string()
}

fn default_status_path() -> String {
    DEFAULT_STATUS_PATH.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            reports_path: default_reports_path(),
            status_path: default_status_path(),
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Parses a `[client]`-style TOML table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the text is not valid TOML or a
    /// field has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies the [`API_URL_ENV`] override, if set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                log::debug!("Using API URL from {API_URL_ENV}: {url}");
                self.base_url = url.to_string();
            }
        }
        self
    }

    /// The configured request timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn fields_override_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://nets.example.org/api"
            status_path = "/ghostnets/{id}/status"
            request_timeout_secs = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://nets.example.org/api");
        assert_eq!(config.reports_path, "/reports");
        assert_eq!(config.status_path, "/ghostnets/{id}/status");
        assert_eq!(config.timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(matches!(
            ClientConfig::from_toml_str("request_timeout_secs = \"soon\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
