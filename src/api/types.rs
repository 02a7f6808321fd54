//! Response types for the CryptoCompare min-api.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::Candle;

/// Body of `/data/pricemulti`: `{"BTC": {"USD": 64000.1}}`.
pub type PriceMultiResponse = HashMap<String, HashMap<String, Decimal>>;

/// Error envelope returned with HTTP 200 when a request is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub response: String,
    #[serde(default)]
    pub message: String,
}

/// Body of the `/data/v2/histo*` endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryResponse {
    pub response: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<HistoryData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HistoryData {
    #[serde(default)]
    pub data: Vec<HistoryBar>,
}

/// A single bar of a history response.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryBar {
    /// Unix seconds
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volumefrom: Decimal,
    #[serde(default)]
    pub volumeto: Decimal,
}

impl HistoryBar {
    fn into_candle(self) -> Option<Candle> {
        let timestamp = Utc.timestamp_opt(self.time, 0).single()?;
        Some(Candle::new(
            timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volumefrom,
            self.volumeto,
        ))
    }
}

/// Extract the price of `symbol` in `currency` from a `pricemulti` body.
///
/// Returns `Ok(None)` when the pair is missing from an otherwise valid body.
pub fn parse_price(body: &str, symbol: &str, currency: &str) -> Result<Option<Decimal>> {
    if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
        if err.response.eq_ignore_ascii_case("error") {
            anyhow::bail!("Price request rejected: {}", err.message);
        }
    }

    let prices: PriceMultiResponse =
        serde_json::from_str(body).context("Failed to parse price response")?;

    Ok(prices
        .get(&symbol.to_uppercase())
        .and_then(|quotes| quotes.get(&currency.to_uppercase()))
        .copied())
}

/// Parse a history body into candles, oldest first.
pub fn parse_history(body: &str) -> Result<Vec<Candle>> {
    let history: HistoryResponse =
        serde_json::from_str(body).context("Failed to parse history response")?;

    if history.response.eq_ignore_ascii_case("error") {
        anyhow::bail!("History request rejected: {}", history.message);
    }

    let mut candles: Vec<Candle> = history
        .data
        .unwrap_or_default()
        .data
        .into_iter()
        .filter_map(HistoryBar::into_candle)
        .collect();

    candles.sort_by_key(|c| c.timestamp);

    Ok(candles)
}
