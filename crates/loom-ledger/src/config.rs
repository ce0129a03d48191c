//! Ledger configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable | Default |
//! |---|---|
//! | `LOOM_DATABASE_PATH` | `loom.db` |
//! | `LOOM_MAX_CONNECTIONS` | `5` |
//! | `LOOM_RECENT_SALES_LIMIT` | `10` |
//! | `LOOM_LOG_LEVEL` | `info` |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use loom_core::DEFAULT_RECENT_SALES_LIMIT;
use loom_db::DbConfig;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Connection pool size
    pub max_connections: u32,

    /// Entries in a sales report's `recent_sales`
    pub recent_sales_limit: usize,

    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("loom.db"),
            max_connections: 5,
            recent_sales_limit: DEFAULT_RECENT_SALES_LIMIT,
            log_level: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            database_path: lookup("LOOM_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "LOOM_MAX_CONNECTIONS", defaults.max_connections)?,

            recent_sales_limit: parse_or(
                &lookup,
                "LOOM_RECENT_SALES_LIMIT",
                defaults.recent_sales_limit,
            )?,

            log_level: lookup("LOOM_LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("LOOM_MAX_CONNECTIONS".to_string()));
        }

        if config.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("LOOM_DATABASE_PATH".to_string()));
        }

        Ok(config)
    }

    /// Pool settings for this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.recent_sales_limit, 10);
    }

    #[test]
    fn test_overrides() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("LOOM_DATABASE_PATH", "/tmp/shop.db"),
            ("LOOM_MAX_CONNECTIONS", "8"),
            ("LOOM_RECENT_SALES_LIMIT", "25"),
            ("LOOM_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.recent_sales_limit, 25);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.db_config().max_connections, 8);
    }

    #[test]
    fn test_invalid_values() {
        let err = LedgerConfig::from_lookup(lookup(&[("LOOM_MAX_CONNECTIONS", "lots")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for LOOM_MAX_CONNECTIONS");

        assert!(LedgerConfig::from_lookup(lookup(&[("LOOM_MAX_CONNECTIONS", "0")])).is_err());
        assert!(LedgerConfig::from_lookup(lookup(&[("LOOM_RECENT_SALES_LIMIT", "-1")])).is_err());
    }
}
