//! Max-loss position sizing.
//!
//! Given an entry price, a stop-loss and a target, size the position so that
//! hitting the stop loses exactly the configured budget:
//!
//! ```text
//! risk_per_unit = |current - stop|
//! position_size = max_loss / risk_per_unit
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected sizing input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SizingError {
    #[error("stop loss cannot equal current price")]
    StopEqualsPrice,
    #[error("max loss must be positive, got {0}")]
    NonPositiveMaxLoss(Decimal),
    #[error("position size exceeds decimal range")]
    Overflow,
}

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionType {
    Long,
    Short,
}

impl PositionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionType::Long => "LONG",
            PositionType::Short => "SHORT",
        }
    }
}

/// Outcome of a sizing computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingResult {
    pub position_type: PositionType,

    /// Units of the base asset
    pub position_size: Decimal,

    pub current_price: Decimal,
    pub stop_loss: Decimal,
    pub target_price: Decimal,

    /// Loss per unit if the stop is hit
    pub risk_per_unit: Decimal,

    /// Total loss at the stop; equals the max-loss budget
    pub potential_loss: Decimal,

    /// Total profit at the target
    pub potential_profit: Decimal,

    pub risk_reward_ratio: Decimal,

    /// Notional value of the position at entry
    pub entry_cost: Decimal,
}

/// Position size calculator bound to a max-loss budget.
#[derive(Debug, Clone)]
pub struct PositionCalculator {
    max_loss_amount: Decimal,
}

impl PositionCalculator {
    /// Create a calculator. The budget must be positive.
    pub fn new(max_loss_amount: Decimal) -> Result<Self, SizingError> {
        ensure_positive(max_loss_amount)?;
        Ok(Self { max_loss_amount })
    }

    pub fn max_loss_amount(&self) -> Decimal {
        self.max_loss_amount
    }

    /// LONG when price is above the stop, SHORT otherwise (ties go SHORT).
    pub fn determine_position_type(&self, current_price: Decimal, stop_loss: Decimal) -> PositionType {
        if current_price > stop_loss {
            PositionType::Long
        } else {
            PositionType::Short
        }
    }

    /// Size a position so that a stop-out loses exactly `max_loss_amount`.
    ///
    /// The direction is derived from the stop when `position_type` is `None`.
    pub fn calculate_position_size(
        &self,
        current_price: Decimal,
        stop_loss: Decimal,
        target_price: Decimal,
        position_type: Option<PositionType>,
    ) -> Result<SizingResult, SizingError> {
        let position_type =
            position_type.unwrap_or_else(|| self.determine_position_type(current_price, stop_loss));

        let (risk_per_unit, profit_per_unit) = match position_type {
            PositionType::Long => (
                checked(current_price.checked_sub(stop_loss))?.abs(),
                checked(target_price.checked_sub(current_price))?.abs(),
            ),
            PositionType::Short => (
                checked(stop_loss.checked_sub(current_price))?.abs(),
                checked(current_price.checked_sub(target_price))?.abs(),
            ),
        };

        if risk_per_unit.is_zero() {
            return Err(SizingError::StopEqualsPrice);
        }

        let position_size = checked(self.max_loss_amount.checked_div(risk_per_unit))?;

        let risk_reward_ratio = if risk_per_unit > Decimal::ZERO {
            checked(profit_per_unit.checked_div(risk_per_unit))?
        } else {
            Decimal::ZERO
        };

        Ok(SizingResult {
            position_type,
            position_size,
            current_price,
            stop_loss,
            target_price,
            risk_per_unit,
            potential_loss: checked(position_size.checked_mul(risk_per_unit))?,
            potential_profit: checked(position_size.checked_mul(profit_per_unit))?,
            risk_reward_ratio,
            entry_cost: checked(position_size.checked_mul(current_price))?,
        })
    }

    /// Replace the budget used by every later computation.
    pub fn update_max_loss(&mut self, new_max_loss: Decimal) -> Result<(), SizingError> {
        ensure_positive(new_max_loss)?;
        self.max_loss_amount = new_max_loss;
        Ok(())
    }
}

fn checked(value: Option<Decimal>) -> Result<Decimal, SizingError> {
    value.ok_or(SizingError::Overflow)
}

fn ensure_positive(max_loss: Decimal) -> Result<(), SizingError> {
    if max_loss <= Decimal::ZERO {
        return Err(SizingError::NonPositiveMaxLoss(max_loss));
    }
    Ok(())
}
