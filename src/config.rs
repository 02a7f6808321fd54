//! Environment-sourced application configuration.
//!
//! Values come from the process environment, optionally seeded from a `.env`
//! file. Validation runs eagerly; an invalid configuration is fatal.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::api::ClientConfig;
use crate::trading::TradingConfig;

/// Configuration could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid decimal: '{value}'")]
    Parse { var: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Top-level settings for the toolkit.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// CryptoCompare key; optional, improves rate limits
    pub api_key: Option<String>,

    pub default_symbol: String,
    pub default_currency: String,

    pub trading: TradingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_symbol: "BTC".to_string(),
            default_currency: "USD".to_string(),
            trading: TradingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup and validate the result.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let trading = TradingConfig {
            max_loss_amount: decimal_var(&non_empty, "MAX_LOSS_AMOUNT")?
                .unwrap_or(defaults.trading.max_loss_amount),
            default_stop_loss_pct: decimal_var(&non_empty, "DEFAULT_STOP_LOSS_PCT")?
                .unwrap_or(defaults.trading.default_stop_loss_pct),
            default_target_pct: decimal_var(&non_empty, "DEFAULT_TARGET_PCT")?
                .unwrap_or(defaults.trading.default_target_pct),
        };

        let config = Self {
            api_key: non_empty("CRYPTOCOMPARE_API_KEY"),
            default_symbol: non_empty("DEFAULT_SYMBOL").unwrap_or(defaults.default_symbol),
            default_currency: non_empty("DEFAULT_CURRENCY").unwrap_or(defaults.default_currency),
            trading,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trading.validate()
    }

    /// Client settings for the market-data provider.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_key: self.api_key.clone(),
            ..ClientConfig::default()
        }
    }
}

fn decimal_var<F>(lookup: &F, var: &'static str) -> Result<Option<Decimal>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => Decimal::from_str(raw.trim())
            .map(Some)
            .map_err(|_| ConfigError::Parse { var, value: raw }),
    }
}
