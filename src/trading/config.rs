//! Risk configuration for trade setups.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Budget and default price band used when sizing a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Maximum amount to lose per trade, in the quote currency
    pub max_loss_amount: Decimal,

    /// Stop-loss distance below price when none is given (0.0 to 1.0)
    pub default_stop_loss_pct: Decimal,

    /// Target distance above price when none is given (0.0 to 1.0)
    pub default_target_pct: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_loss_amount: dec!(300),       // $300 per trade
            default_stop_loss_pct: dec!(0.02), // 2% stop
            default_target_pct: dec!(0.05),    // 5% target
        }
    }
}

impl TradingConfig {
    /// Reject a non-positive budget or a percentage outside (0, 1).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_loss_amount <= Decimal::ZERO {
            return Err(ConfigError::Invalid("MAX_LOSS_AMOUNT must be positive".to_string()));
        }

        if !in_open_unit_interval(self.default_stop_loss_pct) {
            return Err(ConfigError::Invalid(
                "DEFAULT_STOP_LOSS_PCT must be between 0 and 1".to_string(),
            ));
        }

        if !in_open_unit_interval(self.default_target_pct) {
            return Err(ConfigError::Invalid(
                "DEFAULT_TARGET_PCT must be between 0 and 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn in_open_unit_interval(value: Decimal) -> bool {
    value > Decimal::ZERO && value < Decimal::ONE
}
