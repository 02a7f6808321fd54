//! Moving averages over close prices.
//!
//! Both averages return one value per input, `None` while fewer than
//! `period` closes are available.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::models::Candle;

use super::ChartError;

/// Moving-average flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorKind {
    /// Trailing window mean
    Sma,
    /// Exponentially weighted mean, alpha = 2 / (period + 1)
    Ema,
}

/// An indicator to overlay on the price panel, e.g. `SMA_20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    pub period: usize,
}

impl IndicatorSpec {
    pub fn sma(period: usize) -> Self {
        Self {
            kind: IndicatorKind::Sma,
            period,
        }
    }

    pub fn ema(period: usize) -> Self {
        Self {
            kind: IndicatorKind::Ema,
            period,
        }
    }

    /// Legend label ("SMA 20").
    pub fn label(&self) -> String {
        match self.kind {
            IndicatorKind::Sma => format!("SMA {}", self.period),
            IndicatorKind::Ema => format!("EMA {}", self.period),
        }
    }

    pub fn compute(&self, closes: &[f64]) -> Vec<Option<f64>> {
        match self.kind {
            IndicatorKind::Sma => sma(closes, self.period),
            IndicatorKind::Ema => ema(closes, self.period),
        }
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IndicatorKind::Sma => write!(f, "SMA_{}", self.period),
            IndicatorKind::Ema => write!(f, "EMA_{}", self.period),
        }
    }
}

impl FromStr for IndicatorSpec {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChartError::InvalidIndicator(s.to_string());

        let (kind, period) = s.trim().split_once('_').ok_or_else(invalid)?;
        let kind = match kind.to_uppercase().as_str() {
            "SMA" => IndicatorKind::Sma,
            "EMA" => IndicatorKind::Ema,
            _ => return Err(invalid()),
        };
        let period: usize = period.parse().map_err(|_| invalid())?;
        if period == 0 {
            return Err(invalid());
        }

        Ok(Self { kind, period })
    }
}

/// Close prices as floats, in candle order.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .map(|c| c.close.to_f64().unwrap_or(f64::NAN))
        .collect()
}

/// Simple moving average.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = Some(sum / period as f64);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        result[i] = Some(sum / period as f64);
    }

    result
}

/// Exponential moving average, recursive from the first value.
///
/// EMA[0] = x[0]; EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1]. The first
/// `period - 1` outputs are withheld.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if period == 0 || values.is_empty() {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[0];

    for (i, &v) in values.iter().enumerate() {
        if i > 0 {
            prev = alpha * v + (1.0 - alpha) * prev;
        }
        if i + 1 >= period {
            result[i] = Some(prev);
        }
    }

    result
}
