//! Market-data access: the provider interface and the CryptoCompare client.

mod client;
mod provider;
mod types;

pub use client::{ClientConfig, CryptoCompareClient, CRYPTOCOMPARE_API_BASE};
pub use provider::{DataProvider, DEFAULT_HISTORY_LIMIT};
pub use types::{parse_history, parse_price};
