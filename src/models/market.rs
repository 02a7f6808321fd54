//! Spot price quote and 24h market snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Candle;

/// Current price of a symbol in a quote currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub currency: String,
    pub price: Decimal,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(symbol: &str, currency: &str, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            currency: currency.to_uppercase(),
            price,
            fetched_at: Utc::now(),
        }
    }
}

/// Price plus 24h statistics for a trading pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub currency: String,
    pub price: Decimal,

    /// 24h volume in the quote currency
    pub volume_24h: Option<Decimal>,

    /// Absolute change against the daily open
    pub change_24h: Option<Decimal>,

    /// Change against the daily open, in percent
    pub change_pct_24h: Option<Decimal>,

    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,

    /// Not served by the basic price API
    pub market_cap: Option<Decimal>,
}

impl MarketSnapshot {
    /// Snapshot with no 24h statistics.
    pub fn price_only(symbol: &str, currency: &str, price: Decimal) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            currency: currency.to_uppercase(),
            price,
            volume_24h: None,
            change_24h: None,
            change_pct_24h: None,
            high_24h: None,
            low_24h: None,
            market_cap: None,
        }
    }

    /// Build a snapshot from the current price and the daily candle.
    pub fn from_daily(symbol: &str, currency: &str, price: Decimal, daily: &Candle) -> Self {
        let open = daily.open;
        let (change_24h, change_pct_24h) = if open.is_zero() {
            (None, None)
        } else {
            let change = price - open;
            (Some(change), Some(change / open * Decimal::ONE_HUNDRED))
        };

        Self {
            volume_24h: Some(daily.volume_to),
            change_24h,
            change_pct_24h,
            high_24h: Some(daily.high),
            low_24h: Some(daily.low),
            ..Self::price_only(symbol, currency, price)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_from_daily() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let daily = Candle::new(ts, dec!(100), dec!(120), dec!(90), dec!(110), dec!(5), dec!(550));

        let snap = MarketSnapshot::from_daily("btc", "usd", dec!(110), &daily);

        assert_eq!(snap.symbol, "BTC");
        assert_eq!(snap.currency, "USD");
        assert_eq!(snap.change_24h, Some(dec!(10)));
        assert_eq!(snap.change_pct_24h, Some(dec!(10)));
        assert_eq!(snap.volume_24h, Some(dec!(550)));
        assert_eq!(snap.high_24h, Some(dec!(120)));
        assert_eq!(snap.market_cap, None);
    }

    #[test]
    fn test_snapshot_zero_open_has_no_change() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let daily = Candle::new(ts, dec!(0), dec!(1), dec!(0), dec!(1), dec!(0), dec!(0));

        let snap = MarketSnapshot::from_daily("ETH", "USD", dec!(1), &daily);

        assert_eq!(snap.change_24h, None);
        assert_eq!(snap.change_pct_24h, None);
    }
}
