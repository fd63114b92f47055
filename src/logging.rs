//! Optional `tracing` subscriber setup for applications embedding the SDK.
//!
//! The SDK itself only emits events; nothing is printed unless the host
//! installs a subscriber, either its own or the one built here.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `mabi_auction_sdk=debug`.
    pub level: String,
    /// `json` for structured output, anything else for human-readable text.
    pub format: String,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            format: format.into(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber. Returns `false` if one was already set.
    pub fn init(&self) -> bool {
        let filter = self.filter();
        match self.format.as_str() {
            "json" => fmt().json().with_env_filter(filter).try_init().is_ok(),
            _ => fmt().with_env_filter(filter).try_init().is_ok(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config, LoggingConfig::new("info", "json"));
    }
}
