//! Data models for prices, market snapshots and OHLCV candles.

mod candle;
mod market;

pub use candle::{Candle, Timeframe};
pub use market::{MarketSnapshot, PriceQuote};
