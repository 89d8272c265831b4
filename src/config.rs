//! Configuration
//!
//! Provides hierarchical configuration loading from:
//! - queryosity.toml (default configuration)
//! - queryosity.local.toml (git-ignored local overrides)
//! - Environment variables (QUERYOSITY_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # queryosity.toml
//! [concurrency]
//! requested = 4
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! QUERYOSITY_CONCURRENCY__REQUESTED=8
//! QUERYOSITY_LOGGING__LEVEL=debug
//! ```

use figment::{Figment, providers::{Env, Format, Toml}};
use serde::{Deserialize, Serialize};

/// Top-level configuration for a [`crate::Dataflow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controls how many slots a dataflow asks its dataset to partition into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Requested slot count. 0 means "use all available CPU cores".
    #[serde(default)]
    pub requested: usize,

    /// Optional cap on the number of rows processed, applied after
    /// partitioning (see `Dataflow::with_row_limit`).
    #[serde(default)]
    pub row_limit: Option<u64>,
}

impl ConcurrencyConfig {
    /// Resolves `requested` against the host's CPU count.
    pub fn resolved(&self) -> usize {
        if self.requested == 0 {
            num_cpus::get().max(1)
        } else {
            self.requested
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        ConcurrencyConfig { requested: 0, row_limit: None }
    }
}

/// Logging configuration, consumed by [`crate::init_tracing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { level: default_log_level(), format: default_log_format() }
    }
}

impl Config {
    /// Loads configuration from default locations.
    ///
    /// Merges in order:
    /// 1. `queryosity.toml` (base configuration)
    /// 2. `queryosity.local.toml` (local overrides, git-ignored)
    /// 3. Environment variables (`QUERYOSITY_*` prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Self::default())
            .merge(Toml::file("queryosity.toml"))
            .merge(Toml::file("queryosity.local.toml"))
            .merge(Env::prefixed("QUERYOSITY_").split("__"))
            .extract()
    }

    /// Loads configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(Self::default())
            .merge(Toml::file(path))
            .merge(Env::prefixed("QUERYOSITY_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            concurrency: ConcurrencyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl figment::Provider for Config {
    fn metadata(&self) -> figment::Metadata {
        figment::Metadata::named("queryosity defaults")
    }

    fn data(&self) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        figment::providers::Serialized::defaults(self).data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_all_cores() {
        let config = Config::default();
        assert_eq!(config.concurrency.requested, 0);
        assert!(config.concurrency.resolved() >= 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn resolved_concurrency_honors_explicit_request() {
        let mut config = Config::default();
        config.concurrency.requested = 3;
        assert_eq!(config.concurrency.resolved(), 3);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[concurrency]"));
        assert!(toml_str.contains("[logging]"));
    }
}
