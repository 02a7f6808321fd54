//! OHLCV candle model and the timeframes the history endpoints serve.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Candle interval supported by the market-data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Minute,
    Hour,
    Day,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute => "minute",
            Timeframe::Hour => "hour",
            Timeframe::Day => "day",
        }
    }

    /// Capitalized label used in chart titles ("Hour", "Day").
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute => "Minute",
            Timeframe::Hour => "Hour",
            Timeframe::Day => "Day",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "minute" => Ok(Timeframe::Minute),
            "hour" => Ok(Timeframe::Hour),
            "day" => Ok(Timeframe::Day),
            other => Err(format!(
                "invalid timeframe '{}', expected one of minute, hour, day",
                other
            )),
        }
    }
}

/// One OHLCV bar.
///
/// No ordering between open/high/low/close is enforced; the upstream API is
/// trusted for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time
    pub timestamp: DateTime<Utc>,

    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,

    /// Traded volume in the base asset
    #[serde(default)]
    pub volume_from: Decimal,

    /// Traded volume in the quote currency
    #[serde(default)]
    pub volume_to: Decimal,

    /// Volume plotted on charts (quote currency, same as `volume_to`)
    #[serde(default)]
    pub volume: Decimal,
}

impl Candle {
    /// Create a candle whose chart volume is the quote-currency volume.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume_from: Decimal,
        volume_to: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume_from,
            volume_to,
            volume: volume_to,
        }
    }

    /// Close at or above open.
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("minute".parse::<Timeframe>(), Ok(Timeframe::Minute));
        assert_eq!("HOUR".parse::<Timeframe>(), Ok(Timeframe::Hour));
        assert_eq!(" Day ".parse::<Timeframe>(), Ok(Timeframe::Day));
        assert!("week".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_candle_volume_is_quote_volume() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let candle = Candle::new(ts, dec!(100), dec!(110), dec!(95), dec!(105), dec!(2), dec!(210));

        assert_eq!(candle.volume, dec!(210));
        assert!(candle.is_bullish());
    }
}
