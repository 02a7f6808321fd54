//! CryptoCompare min-api client for prices and OHLCV history.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::{Candle, MarketSnapshot, Timeframe};

use super::provider::DataProvider;
use super::types::{parse_history, parse_price};

pub const CRYPTOCOMPARE_API_BASE: &str = "https://min-api.cryptocompare.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`CryptoCompareClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,

    /// Optional key; raises the API rate limits
    pub api_key: Option<String>,

    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: CRYPTOCOMPARE_API_BASE.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Read-only client for the CryptoCompare REST API.
pub struct CryptoCompareClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CryptoCompareClient {
    /// Create a client from explicit settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        Self::new(ClientConfig {
            base_url,
            ..ClientConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn price_url(&self, symbol: &str, currency: &str) -> String {
        format!(
            "{}/data/pricemulti?fsyms={}&tsyms={}",
            self.base_url,
            symbol.to_uppercase(),
            currency.to_uppercase()
        )
    }

    fn history_url(&self, symbol: &str, currency: &str, timeframe: Timeframe, limit: u32) -> String {
        format!(
            "{}/data/v2/histo{}?fsym={}&tsym={}&limit={}",
            self.base_url,
            timeframe.as_str(),
            symbol.to_uppercase(),
            currency.to_uppercase(),
            limit
        )
    }

    async fn get_text(&self, url: &str, what: &str) -> Result<String> {
        debug!(url = %url, "Fetching {}", what);

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Apikey {}", key));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} request failed: {} - {}", what, status, body);
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response", what))
    }

    /// Fetch the current price, failing on any error.
    pub async fn fetch_price(&self, symbol: &str, currency: &str) -> Result<Decimal> {
        let body = self.get_text(&self.price_url(symbol, currency), "price").await?;

        parse_price(&body, symbol, currency)?.ok_or_else(|| {
            anyhow::anyhow!(
                "No price for {}/{} in response",
                symbol.to_uppercase(),
                currency.to_uppercase()
            )
        })
    }

    /// Fetch OHLCV history, failing on any error or an empty series.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        currency: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let url = self.history_url(symbol, currency, timeframe, limit);
        let body = self.get_text(&url, "history").await?;
        let candles = parse_history(&body)?;

        if candles.is_empty() {
            anyhow::bail!(
                "Empty {} history for {}/{}",
                timeframe,
                symbol.to_uppercase(),
                currency.to_uppercase()
            );
        }

        Ok(candles)
    }

    /// Fetch price plus the latest daily bar for 24h statistics.
    ///
    /// Only a price failure is an error; without a daily bar the snapshot
    /// carries the price alone.
    pub async fn fetch_market_data(&self, symbol: &str, currency: &str) -> Result<MarketSnapshot> {
        let price = self.fetch_price(symbol, currency).await?;

        match self.fetch_daily_bar(symbol, currency).await {
            Ok(Some(bar)) => Ok(MarketSnapshot::from_daily(symbol, currency, price, &bar)),
            Ok(None) => Ok(MarketSnapshot::price_only(symbol, currency, price)),
            Err(e) => {
                warn!(symbol = %symbol, currency = %currency, error = %e, "24h statistics unavailable");
                Ok(MarketSnapshot::price_only(symbol, currency, price))
            }
        }
    }

    async fn fetch_daily_bar(&self, symbol: &str, currency: &str) -> Result<Option<Candle>> {
        let url = self.history_url(symbol, currency, Timeframe::Day, 1);
        let body = self.get_text(&url, "daily history").await?;
        Ok(parse_history(&body)?.into_iter().next())
    }
}

#[async_trait]
impl DataProvider for CryptoCompareClient {
    async fn get_current_price(&self, symbol: &str, currency: &str) -> Option<Decimal> {
        match self.fetch_price(symbol, currency).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(symbol = %symbol, currency = %currency, error = %e, "Price unavailable");
                None
            }
        }
    }

    async fn get_market_data(&self, symbol: &str, currency: &str) -> Option<MarketSnapshot> {
        match self.fetch_market_data(symbol, currency).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(symbol = %symbol, currency = %currency, error = %e, "Market data unavailable");
                None
            }
        }
    }

    async fn get_historical_ohlcv(
        &self,
        symbol: &str,
        currency: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Option<Vec<Candle>> {
        match self.fetch_history(symbol, currency, timeframe, limit).await {
            Ok(candles) => Some(candles),
            Err(e) => {
                warn!(
                    symbol = %symbol,
                    currency = %currency,
                    timeframe = %timeframe,
                    error = %e,
                    "Historical data unavailable"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_urls() {
        let client = CryptoCompareClient::with_base_url("http://localhost:9/".to_string()).unwrap();

        assert_eq!(
            client.price_url("btc", "usd"),
            "http://localhost:9/data/pricemulti?fsyms=BTC&tsyms=USD"
        );
        assert_eq!(
            client.history_url("eth", "eur", Timeframe::Minute, 360),
            "http://localhost:9/data/v2/histominute?fsym=ETH&tsym=EUR&limit=360"
        );
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let client = CryptoCompareClient::new(ClientConfig {
            api_key: Some("  ".to_string()),
            ..ClientConfig::default()
        })
        .unwrap();

        assert!(!client.has_api_key());
        assert_eq!(client.base_url(), CRYPTOCOMPARE_API_BASE);
    }

    /// Serve canned bodies over plain HTTP: `pricemulti` gets `price_body`,
    /// every other path gets `history_body`.
    async fn serve(price_body: &'static str, history_body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&request);
                let body = if head.contains("/data/pricemulti") {
                    price_body
                } else {
                    history_body
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_market_data_keeps_price_when_history_rejected() {
        let base_url = serve(
            r#"{"BTC":{"USD":64000}}"#,
            r#"{"Response":"Error","Message":"rate limit","Data":{}}"#,
        )
        .await;
        let client = CryptoCompareClient::with_base_url(base_url).unwrap();

        assert_eq!(client.get_current_price("BTC", "USD").await, Some(dec!(64000)));

        let snapshot = client.get_market_data("BTC", "USD").await.unwrap();
        assert_eq!(snapshot, MarketSnapshot::price_only("BTC", "USD", dec!(64000)));
    }

    #[tokio::test]
    async fn test_market_data_with_daily_bar() {
        let base_url = serve(
            r#"{"BTC":{"USD":110}}"#,
            r#"{"Response":"Success","Message":"","Data":{"Data":[
                {"time":1700000000,"open":100,"high":120,"low":90,"close":110,"volumefrom":5,"volumeto":550}
            ]}}"#,
        )
        .await;
        let client = CryptoCompareClient::with_base_url(base_url).unwrap();

        let snapshot = client.get_market_data("btc", "usd").await.unwrap();

        assert_eq!(snapshot.change_24h, Some(dec!(10)));
        assert_eq!(snapshot.change_pct_24h, Some(dec!(10)));
        assert_eq!(snapshot.volume_24h, Some(dec!(550)));
    }

    #[tokio::test]
    async fn test_market_data_without_price_is_unavailable() {
        let base_url = serve(
            r#"{"Response":"Error","Message":"fsyms param seems to be missing.","Data":{}}"#,
            r#"{"Response":"Success","Message":"","Data":{"Data":[]}}"#,
        )
        .await;
        let client = CryptoCompareClient::with_base_url(base_url).unwrap();

        assert_eq!(client.get_market_data("BTC", "USD").await, None);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        // Port 9 (discard) is closed on loopback, so the connect fails fast.
        let client = CryptoCompareClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        assert_eq!(client.get_current_price("BTC", "USD").await, None);
        assert_eq!(client.get_market_data("BTC", "USD").await, None);
        assert_eq!(
            client.get_historical_ohlcv("BTC", "USD", Timeframe::Hour, 10).await,
            None
        );
    }
}
