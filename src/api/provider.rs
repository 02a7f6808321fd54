//! Market-data capability interface.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{Candle, MarketSnapshot, Timeframe};

/// Candles fetched per timeframe when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

static DEFAULT_TIMEFRAMES: [Timeframe; 2] = [Timeframe::Hour, Timeframe::Day];

/// Source of prices and OHLCV history.
///
/// Every method returns `None` when the data is unavailable for any reason
/// (transport, HTTP status, parse). Callers must treat `None` as "cannot
/// proceed", never as a zero price.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn get_current_price(&self, symbol: &str, currency: &str) -> Option<Decimal>;

    async fn get_market_data(&self, symbol: &str, currency: &str) -> Option<MarketSnapshot>;

    /// Candles for `symbol`/`currency`, oldest first.
    async fn get_historical_ohlcv(
        &self,
        symbol: &str,
        currency: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Option<Vec<Candle>>;

    /// Fetch several timeframes one after another, skipping unavailable ones.
    ///
    /// An empty `timeframes` slice means hour and day.
    async fn get_ohlcv_multi_timeframe(
        &self,
        symbol: &str,
        currency: &str,
        timeframes: &[Timeframe],
    ) -> Vec<(Timeframe, Vec<Candle>)> {
        let timeframes = if timeframes.is_empty() {
            &DEFAULT_TIMEFRAMES[..]
        } else {
            timeframes
        };

        let mut result = Vec::with_capacity(timeframes.len());
        for &tf in timeframes {
            if let Some(candles) = self
                .get_historical_ohlcv(symbol, currency, tf, DEFAULT_HISTORY_LIMIT)
                .await
            {
                result.push((tf, candles));
            }
        }
        result
    }
}
