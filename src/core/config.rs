//! Configuration management for the TestRail MCP server.
//!
//! Settings come from CLI flags, the process environment, or a `.env`
//! file loaded at startup. They are validated once and then handed to
//! the API dispatcher by reference.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment variable holding the TestRail instance URL.
pub const ENV_URL: &str = "TESTRAIL_URL";

/// Environment variable holding the TestRail username (usually an email).
pub const ENV_USERNAME: &str = "TESTRAIL_USERNAME";

/// Environment variable holding the TestRail API key.
pub const ENV_API_KEY: &str = "TESTRAIL_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing TestRail configuration: {} must be set", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("Invalid TestRail URL '{0}': expected an http:// or https:// address")]
    InvalidUrl(String),
}

/// Connection settings for a TestRail instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the instance (e.g. `https://example.testrail.io/`)
    pub url: String,

    /// Username or email used for Basic auth
    pub username: String,

    /// API key used in place of the account password
    pub api_key: String,
}

impl Config {
    /// Build a validated configuration from optional parts.
    ///
    /// Every missing or blank setting is reported at once so the user can
    /// fix their environment in a single pass.
    pub fn new(
        url: Option<String>,
        username: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let url = non_blank(url);
        let username = non_blank(username);
        let api_key = non_blank(api_key);

        let mut missing = Vec::new();
        if url.is_none() {
            missing.push(ENV_URL);
        }
        if username.is_none() {
            missing.push(ENV_USERNAME);
        }
        if api_key.is_none() {
            missing.push(ENV_API_KEY);
        }

        match (url, username, api_key) {
            (Some(url), Some(username), Some(api_key)) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::InvalidUrl(url));
                }
                Ok(Self { url, username, api_key })
            }
            _ => Err(ConfigError::Missing(missing)),
        }
    }

    /// Load configuration from `TESTRAIL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            std::env::var(ENV_URL).ok(),
            std::env::var(ENV_USERNAME).ok(),
            std::env::var(ENV_API_KEY).ok(),
        )
    }
}

// API key stays out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
