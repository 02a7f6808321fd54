//! Crypto trade setup toolkit.
//!
//! Fetches prices and OHLCV history from CryptoCompare, renders candlestick
//! charts, and sizes positions so that a stop-out loses a fixed budget.

pub mod api;
pub mod chart;
pub mod config;
pub mod models;
pub mod trading;

pub use api::{ClientConfig, CryptoCompareClient, DataProvider};
pub use chart::{ChartFormat, ChartOptions, ChartVisualizer, IndicatorSpec, Theme};
pub use config::{AppConfig, ConfigError};
pub use models::{Candle, MarketSnapshot, PriceQuote, Timeframe};
pub use trading::{
    Action, PositionCalculator, PositionType, SimpleStopLossStrategy, SizingError, SizingResult,
    Strategy, TradeSetup, TradingConfig,
};
