//! Trading logic: max-loss position sizing and trade-setup strategies.

mod config;
mod position_calculator;
mod simple_strategy;
mod strategy;

pub use config::TradingConfig;
pub use position_calculator::{PositionCalculator, PositionType, SizingError, SizingResult};
pub use simple_strategy::SimpleStopLossStrategy;
pub use strategy::{Action, Entry, Signal, Strategy, TradeSetup};
