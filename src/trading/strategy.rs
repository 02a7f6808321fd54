//! Strategy interface and the records it produces.
//!
//! A strategy turns market data into a signal (direction plus stop and
//! target levels) and then into a sized entry. Both steps return `None`
//! when they cannot proceed; `execute_strategy` chains them.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position_calculator::{PositionType, SizingResult};

/// Trade direction suggested by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }
}

/// Direction and price levels for a prospective trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    pub current_price: Decimal,
    pub stop_loss: Decimal,
    pub target: Decimal,

    /// Strategy confidence (0.0 to 1.0)
    pub confidence: f64,
}

/// Sized entry: the sizing result plus the signal's action and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(flatten)]
    pub sizing: SizingResult,
    pub action: Action,
    pub confidence: f64,
}

impl Entry {
    pub fn position_type(&self) -> PositionType {
        self.sizing.position_type
    }
}

/// Complete trade setup from one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSetup {
    pub signal: Signal,
    pub entry: Entry,

    /// Capture time, UTC, ISO-8601
    pub timestamp: String,
}

/// A trading strategy.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Produce a signal, or `None` if market data is unavailable.
    async fn generate_signal(&self) -> Option<Signal>;

    /// Produce a sized entry, or `None` if no valid entry exists.
    async fn calculate_entry(&self) -> Option<Entry>;

    /// Run signal generation then entry calculation.
    async fn execute_strategy(&self) -> Option<TradeSetup> {
        let signal = self.generate_signal().await?;
        let entry = self.calculate_entry().await?;

        Some(TradeSetup {
            signal,
            entry,
            timestamp: capture_timestamp(),
        })
    }
}

fn capture_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
