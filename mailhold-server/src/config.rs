//! Configuration module for environment variable parsing.
//!
//! Every setting has a default, so the server starts with an empty environment.

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Directory holding `{id}.eml` files
    pub message_dir: PathBuf,

    /// SMTP relay used for forwarding
    pub relay_host: String,
    pub relay_port: u16,

    /// Envelope sender for forwards whose original sender is unusable
    pub forward_sender: Option<String>,

    /// Maximum number of entries returned by a list query
    pub list_limit: usize,

    /// Decomposed messages kept in memory (0 disables the cache)
    pub decompose_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            message_dir: PathBuf::from("./messages"),
            relay_host: "localhost".to_string(),
            relay_port: 25,
            forward_sender: None,
            list_limit: 150,
            decompose_cache_size: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_var("PORT", defaults.port),

            message_dir: env::var("MESSAGE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.message_dir),

            relay_host: env::var("RELAY_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.relay_host),

            relay_port: parse_var("RELAY_PORT", defaults.relay_port),

            forward_sender: env::var("FORWARD_SENDER")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),

            list_limit: parse_var("LIST_LIMIT", defaults.list_limit),

            decompose_cache_size: parse_var("DECOMPOSE_CACHE_SIZE", defaults.decompose_cache_size),
        }
    }
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
