//! Core configuration shared by the CLI and the server.

mod config;

pub use config::{Config, ConfigError, ENV_API_KEY, ENV_URL, ENV_USERNAME};
