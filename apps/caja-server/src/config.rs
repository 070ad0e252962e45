//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                  | Default        |
//! |---------------------------|----------------|
//! | `CAJA_BIND_ADDR`          | `0.0.0.0:8080` |
//! | `CAJA_DB_PATH`            | `caja.db`      |
//! | `CAJA_DB_MAX_CONNECTIONS` | `8`            |
//! | `CAJA_LOCK_TIMEOUT_MS`    | `5000`         |
//! | `CAJA_VAT_BPS`            | `1900`         |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use caja_core::validation::validate_vat_bps;
use caja_core::VatRate;
use caja_db::DbConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Longest wait for the writer lock before a retryable failure
    pub lock_timeout: Duration,

    /// VAT rate applied by reports
    pub vat_rate: VatRate,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let vat_bps: u32 = get("CAJA_VAT_BPS", "1900")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CAJA_VAT_BPS".to_string()))?;
        validate_vat_bps(vat_bps).map_err(|_| ConfigError::InvalidValue("CAJA_VAT_BPS".to_string()))?;

        let config = ServerConfig {
            bind_addr: get("CAJA_BIND_ADDR", "0.0.0.0:8080")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CAJA_BIND_ADDR".to_string()))?,

            database_path: PathBuf::from(get("CAJA_DB_PATH", "caja.db")),

            max_connections: get("CAJA_DB_MAX_CONNECTIONS", "8")
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CAJA_DB_MAX_CONNECTIONS".to_string()))?,

            lock_timeout: get("CAJA_LOCK_TIMEOUT_MS", "5000")
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidValue("CAJA_LOCK_TIMEOUT_MS".to_string()))?,

            vat_rate: VatRate::from_bps(vat_bps),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("CAJA_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .lock_timeout(self.lock_timeout)
            .vat_rate(self.vat_rate)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
