//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{BALANCE_TOLERANCE, Currency};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger and budget numeric configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Tolerance for sum-equality checks, read through [`Self::balance_tolerance`].
    #[serde(default = "default_balance_tolerance")]
    balance_tolerance: Decimal,
    /// Functional currency of every company book.
    #[serde(default = "default_functional_currency")]
    pub functional_currency: Currency,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_tolerance: default_balance_tolerance(),
            functional_currency: default_functional_currency(),
        }
    }
}

impl LedgerConfig {
    /// Tolerance for sum-equality checks.
    ///
    /// A configured value can tighten the one-cent tolerance but never
    /// loosen it.
    #[must_use]
    pub fn balance_tolerance(&self) -> Decimal {
        self.balance_tolerance.clamp(Decimal::ZERO, BALANCE_TOLERANCE)
    }
}

fn default_balance_tolerance() -> Decimal {
    BALANCE_TOLERANCE
}

fn default_functional_currency() -> Currency {
    Currency::Cop
}

/// Transactional store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// How long a transaction waits for the company lock before reporting a conflict.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "erario=debug".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ERARIO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_without_environment() {
        temp_env::with_vars_unset(
            [
                "ERARIO__LEDGER__BALANCE_TOLERANCE",
                "ERARIO__STORE__LOCK_TIMEOUT_MS",
                "ERARIO__LOGGING__JSON",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ledger.balance_tolerance(), dec!(0.01));
                assert_eq!(config.ledger.functional_currency, Currency::Cop);
                assert_eq!(config.store.lock_timeout_ms, 5000);
                assert_eq!(config.logging.filter, "erario=debug");
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("ERARIO__STORE__LOCK_TIMEOUT_MS", Some("250")),
                ("ERARIO__LOGGING__JSON", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.store.lock_timeout_ms, 250);
                assert!(config.logging.json);
            },
        );
    }

    #[test]
    fn test_tolerance_never_loosens() {
        temp_env::with_var("ERARIO__LEDGER__BALANCE_TOLERANCE", Some("0.5"), || {
            let config = AppConfig::load().unwrap();
            assert_eq!(config.ledger.balance_tolerance(), dec!(0.01));
        });
        temp_env::with_var("ERARIO__LEDGER__BALANCE_TOLERANCE", Some("0.001"), || {
            let config = AppConfig::load().unwrap();
            assert_eq!(config.ledger.balance_tolerance(), dec!(0.001));
        });
    }
}
