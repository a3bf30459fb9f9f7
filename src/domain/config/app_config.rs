//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::Duration;

/// Default chat server base URL
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_url: Option<String>,
    pub max_duration: Option<String>,
    pub upload_timeout: Option<String>,
    pub input_device: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            server_url: Some(DEFAULT_SERVER_URL.to_string()),
            max_duration: Some(Duration::default_max_duration().to_string()),
            upload_timeout: Some(Duration::default_upload_timeout().to_string()),
            input_device: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            server_url: other.server_url.or(self.server_url),
            max_duration: other.max_duration.or(self.max_duration),
            upload_timeout: other.upload_timeout.or(self.upload_timeout),
            input_device: other.input_device.or(self.input_device),
        }
    }

    /// Get server URL without a trailing slash, or the default
    pub fn server_url_or_default(&self) -> String {
        self.server_url
            .as_deref()
            .map(|s| s.trim().trim_end_matches('/'))
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SERVER_URL)
            .to_string()
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Get upload_timeout as parsed Duration, or default if not set/invalid
    pub fn upload_timeout_or_default(&self) -> Duration {
        self.upload_timeout
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_upload_timeout)
    }

    /// Preferred input device name, if one is configured
    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref().filter(|s| !s.is_empty())
    }
}
