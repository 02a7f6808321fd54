//! Candlestick charts with volume and moving-average overlays.
//!
//! Charts render to a self-contained interactive HTML document or to a
//! static SVG image.

mod html;
pub mod indicators;
mod svg;
mod visualizer;

use thiserror::Error;

pub use indicators::{IndicatorKind, IndicatorSpec};
pub use visualizer::{
    Chart, ChartFormat, ChartOptions, ChartVisualizer, LineSeries, MultiChart, Theme,
};

/// Chart construction or output failure.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("candle series is empty")]
    EmptySeries,
    #[error("invalid indicator '{0}', expected SMA_<period> or EMA_<period>")]
    InvalidIndicator(String),
    #[error("invalid chart format '{0}', expected html or svg")]
    InvalidFormat(String),
    #[error("failed to write chart: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize chart data: {0}")]
    Serialization(#[from] serde_json::Error),
}
