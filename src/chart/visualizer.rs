//! Chart construction, indicator overlays, persistence and display.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::models::{Candle, Timeframe};

use super::indicators::{closes, IndicatorKind, IndicatorSpec};
use super::{html, svg, ChartError};

const DEFAULT_HEIGHT: u32 = 800;
pub(crate) const DEFAULT_WIDTH: u32 = 1200;

/// Color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

/// Resolved colors for a theme.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub grid: &'static str,
    pub increasing: &'static str,
    pub decreasing: &'static str,
    pub volume_increasing: &'static str,
    pub volume_decreasing: &'static str,
}

impl Theme {
    pub(crate) fn palette(&self) -> Palette {
        let (background, text, grid) = match self {
            Theme::Dark => ("#111111", "#f2f5fa", "#283442"),
            Theme::Light => ("#ffffff", "#2a3f5f", "#ebf0f8"),
        };
        Palette {
            background,
            text,
            grid,
            increasing: "#26a69a",
            decreasing: "#ef5350",
            volume_increasing: "rgba(38, 166, 154, 0.5)",
            volume_decreasing: "rgba(239, 83, 80, 0.5)",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("invalid theme '{}', expected dark or light", other)),
        }
    }
}

/// Output format for [`ChartVisualizer::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartFormat {
    /// Self-contained interactive document
    #[default]
    Html,
    /// Static vector image
    Svg,
}

impl ChartFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ChartFormat::Html => "html",
            ChartFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ChartFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ChartFormat {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" | "htm" => Ok(ChartFormat::Html),
            "svg" => Ok(ChartFormat::Svg),
            other => Err(ChartError::InvalidFormat(other.to_string())),
        }
    }
}

/// Layout options for a single chart.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub timeframe: Timeframe,

    /// Defaults to "{SYMBOL}/{CURRENCY} - {Timeframe} Chart"
    pub title: Option<String>,

    pub show_volume: bool,

    /// Height in pixels
    pub height: u32,

    /// Width in pixels; 1200 when unset
    pub width: Option<u32>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::Hour,
            title: None,
            show_volume: true,
            height: DEFAULT_HEIGHT,
            width: None,
        }
    }
}

/// Candle values as plotted.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CandlePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl CandlePoint {
    fn from_candle(candle: &Candle) -> Self {
        Self {
            timestamp: candle.timestamp,
            open: to_f64(candle.open),
            high: to_f64(candle.high),
            low: to_f64(candle.low),
            close: to_f64(candle.close),
            volume: to_f64(candle.volume),
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Indicator line drawn over the price panel.
#[derive(Debug, Clone, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub kind: IndicatorKind,

    /// One value per candle timestamp; `None` where undefined
    pub points: Vec<(DateTime<Utc>, Option<f64>)>,
}

/// A rendered candlestick chart.
#[derive(Debug, Clone)]
pub struct Chart {
    pub(crate) title: String,
    pub(crate) symbol: String,
    pub(crate) currency: String,
    pub(crate) timeframe: Timeframe,
    pub(crate) theme: Theme,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) show_volume: bool,
    pub(crate) candles: Vec<CandlePoint>,
    pub(crate) overlays: Vec<LineSeries>,
}

impl Chart {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candle_count(&self) -> usize {
        self.candles.len()
    }

    pub fn has_volume(&self) -> bool {
        self.show_volume
    }

    pub fn overlays(&self) -> &[LineSeries] {
        &self.overlays
    }

    /// Overlay values re-indexed onto this chart's candles.
    pub(crate) fn aligned_overlay(&self, series: &LineSeries) -> Vec<Option<f64>> {
        let by_time: HashMap<DateTime<Utc>, Option<f64>> = series.points.iter().copied().collect();
        self.candles
            .iter()
            .map(|c| by_time.get(&c.timestamp).copied().flatten())
            .collect()
    }

    /// Static SVG image of the chart.
    pub fn to_svg(&self) -> String {
        svg::render_svg(self, "chart")
    }

    /// Self-contained interactive HTML document.
    pub fn to_html(&self) -> Result<String, ChartError> {
        html::chart_document(self)
    }
}

/// Several charts of one pair, switchable by timeframe.
#[derive(Debug, Clone)]
pub struct MultiChart {
    pub(crate) title: String,
    pub(crate) charts: Vec<Chart>,
    pub(crate) default_index: usize,
}

impl MultiChart {
    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.charts.iter().map(|c| c.timeframe).collect()
    }

    pub fn default_timeframe(&self) -> Timeframe {
        self.charts[self.default_index].timeframe
    }

    pub fn to_html(&self) -> Result<String, ChartError> {
        html::multi_document(self)
    }
}

/// Builds candlestick charts with volume panels and indicator overlays.
#[derive(Debug, Clone, Default)]
pub struct ChartVisualizer {
    theme: Theme,
}

impl ChartVisualizer {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Build a candlestick chart, with a volume panel when requested.
    pub fn render(
        &self,
        candles: &[Candle],
        symbol: &str,
        currency: &str,
        options: &ChartOptions,
    ) -> Result<Chart, ChartError> {
        if candles.is_empty() {
            return Err(ChartError::EmptySeries);
        }

        let symbol = symbol.to_uppercase();
        let currency = currency.to_uppercase();
        let title = options.title.clone().unwrap_or_else(|| {
            format!("{}/{} - {} Chart", symbol, currency, options.timeframe.label())
        });

        debug!(title = %title, candles = candles.len(), "Rendering chart");

        Ok(Chart {
            title,
            symbol,
            currency,
            timeframe: options.timeframe,
            theme: self.theme,
            width: options.width.unwrap_or(DEFAULT_WIDTH),
            height: options.height,
            show_volume: options.show_volume,
            candles: candles.iter().map(CandlePoint::from_candle).collect(),
            overlays: Vec::new(),
        })
    }

    /// Add one line per indicator, computed over `candles` closes.
    pub fn overlay_indicators(
        &self,
        mut chart: Chart,
        candles: &[Candle],
        indicators: &[IndicatorSpec],
    ) -> Chart {
        let closes = closes(candles);

        for spec in indicators {
            let values = spec.compute(&closes);
            let points = candles
                .iter()
                .map(|c| c.timestamp)
                .zip(values)
                .collect();

            chart.overlays.push(LineSeries {
                name: spec.label(),
                kind: spec.kind,
                points,
            });
        }

        chart
    }

    /// One document holding a chart per timeframe with a selector.
    ///
    /// Falls back to the first series when `default_timeframe` is absent.
    pub fn render_multi_timeframe(
        &self,
        series: &[(Timeframe, Vec<Candle>)],
        symbol: &str,
        currency: &str,
        default_timeframe: Timeframe,
    ) -> Result<MultiChart, ChartError> {
        if series.is_empty() {
            return Err(ChartError::EmptySeries);
        }

        let charts = series
            .iter()
            .map(|(tf, candles)| {
                let options = ChartOptions {
                    timeframe: *tf,
                    ..ChartOptions::default()
                };
                self.render(candles, symbol, currency, &options)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let default_index = charts
            .iter()
            .position(|c| c.timeframe == default_timeframe)
            .unwrap_or(0);

        Ok(MultiChart {
            title: format!("{}/{}", symbol.to_uppercase(), currency.to_uppercase()),
            charts,
            default_index,
        })
    }

    /// Write the chart to `path` in the given format.
    pub fn persist(
        &self,
        chart: &Chart,
        path: impl AsRef<Path>,
        format: ChartFormat,
    ) -> Result<PathBuf, ChartError> {
        let contents = match format {
            ChartFormat::Html => chart.to_html()?,
            ChartFormat::Svg => chart.to_svg(),
        };
        write_output(path.as_ref(), &contents)
    }

    /// Write a multi-timeframe document (HTML only).
    pub fn persist_multi(&self, chart: &MultiChart, path: impl AsRef<Path>) -> Result<PathBuf, ChartError> {
        write_output(path.as_ref(), &chart.to_html()?)
    }

    /// Open the chart in the default browser via a temporary HTML file.
    pub fn display(&self, chart: &Chart) -> Result<PathBuf, ChartError> {
        let file_name = format!(
            "{}_{}_{}_chart.html",
            chart.symbol.to_lowercase(),
            chart.currency.to_lowercase(),
            chart.timeframe
        );
        let path = self.persist(chart, std::env::temp_dir().join(file_name), ChartFormat::Html)?;
        open_in_browser(&path)?;
        Ok(path)
    }
}

fn write_output(path: &Path, contents: &str) -> Result<PathBuf, ChartError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    info!(path = %path.display(), "Chart saved");
    Ok(path.to_path_buf())
}

fn open_in_browser(path: &Path) -> Result<(), ChartError> {
    run_launcher(browser_command(path))
}

/// Platform launcher for `path`; each returns once the browser is asked.
fn browser_command(path: &Path) -> Command {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    command.arg(path);
    command
}

/// Run the launcher to completion so no child is left behind.
fn run_launcher(mut command: Command) -> Result<(), ChartError> {
    let status = command.status()?;
    if !status.success() {
        return Err(ChartError::Io(std::io::Error::other(format!(
            "{:?} exited with {}",
            command.get_program(),
            status
        ))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn sample_candles(n: usize) -> Vec<Candle> {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        (0..n)
            .map(|i| {
                let base = Decimal::from(100 + i as i64);
                let (open, close) = if i % 2 == 0 {
                    (base, base + dec!(2))
                } else {
                    (base + dec!(2), base)
                };
                Candle::new(
                    start + Duration::hours(i as i64),
                    open,
                    base + dec!(3),
                    base - dec!(1),
                    close,
                    dec!(1.5),
                    dec!(150) + Decimal::from(i as i64),
                )
            })
            .collect()
    }

    #[test]
    fn test_render_defaults() {
        let viz = ChartVisualizer::default();
        let chart = viz
            .render(&sample_candles(30), "btc", "usd", &ChartOptions::default())
            .unwrap();

        assert_eq!(chart.title(), "BTC/USD - Hour Chart");
        assert_eq!(chart.candle_count(), 30);
        assert!(chart.has_volume());
        assert_eq!(chart.width, DEFAULT_WIDTH);
        assert_eq!(chart.height, 800);
        assert_eq!(viz.theme(), Theme::Dark);
    }

    #[test]
    fn test_render_empty_series() {
        let viz = ChartVisualizer::default();
        let err = viz
            .render(&[], "BTC", "USD", &ChartOptions::default())
            .unwrap_err();
        assert!(matches!(err, ChartError::EmptySeries));
    }

    #[test]
    fn test_custom_title_and_size() {
        let viz = ChartVisualizer::new(Theme::Light);
        let options = ChartOptions {
            timeframe: Timeframe::Day,
            title: Some("My chart".to_string()),
            show_volume: false,
            height: 600,
            width: Some(900),
        };
        let chart = viz.render(&sample_candles(5), "ETH", "EUR", &options).unwrap();

        assert_eq!(chart.title(), "My chart");
        assert_eq!(chart.timeframe(), Timeframe::Day);
        assert!(!chart.has_volume());
        assert_eq!((chart.width, chart.height), (900, 600));
    }

    #[test]
    fn test_overlay_alignment() {
        let viz = ChartVisualizer::default();
        let candles = sample_candles(25);
        let chart = viz
            .render(&candles, "BTC", "USD", &ChartOptions::default())
            .unwrap();
        let chart = viz.overlay_indicators(
            chart,
            &candles,
            &[IndicatorSpec::sma(20), IndicatorSpec::ema(12)],
        );

        assert_eq!(chart.overlays().len(), 2);
        let sma = &chart.overlays()[0];
        assert_eq!(sma.name, "SMA 20");
        assert_eq!(sma.points.len(), 25);
        assert_eq!(sma.points[0].0, candles[0].timestamp);
        assert!(sma.points[..19].iter().all(|(_, v)| v.is_none()));
        assert!(sma.points[19..].iter().all(|(_, v)| v.is_some()));

        let aligned = chart.aligned_overlay(&chart.overlays()[1]);
        assert_eq!(aligned.len(), 25);
        assert!(aligned[10].is_none());
        assert!(aligned[11].is_some());
    }

    #[test]
    fn test_overlay_on_subset_leaves_gaps() {
        let viz = ChartVisualizer::default();
        let candles = sample_candles(10);
        let chart = viz
            .render(&candles, "BTC", "USD", &ChartOptions::default())
            .unwrap();
        let chart = viz.overlay_indicators(chart, &candles[5..], &[IndicatorSpec::sma(1)]);

        let aligned = chart.aligned_overlay(&chart.overlays()[0]);
        assert!(aligned[..5].iter().all(Option::is_none));
        assert!(aligned[5..].iter().all(Option::is_some));
    }

    #[test]
    fn test_multi_timeframe_default_fallback() {
        let viz = ChartVisualizer::default();
        let series = vec![
            (Timeframe::Hour, sample_candles(10)),
            (Timeframe::Day, sample_candles(5)),
        ];

        let multi = viz
            .render_multi_timeframe(&series, "btc", "usd", Timeframe::Day)
            .unwrap();
        assert_eq!(multi.timeframes(), vec![Timeframe::Hour, Timeframe::Day]);
        assert_eq!(multi.default_timeframe(), Timeframe::Day);

        let multi = viz
            .render_multi_timeframe(&series, "btc", "usd", Timeframe::Minute)
            .unwrap();
        assert_eq!(multi.default_timeframe(), Timeframe::Hour);

        assert!(viz
            .render_multi_timeframe(&[], "btc", "usd", Timeframe::Hour)
            .is_err());
    }

    #[test]
    fn test_persist_formats() {
        let dir = tempfile::tempdir().unwrap();
        let viz = ChartVisualizer::default();
        let candles = sample_candles(30);
        let chart = viz
            .render(&candles, "BTC", "USD", &ChartOptions::default())
            .unwrap();
        let chart = viz.overlay_indicators(chart, &candles, &[IndicatorSpec::sma(5)]);

        let html_path = viz
            .persist(&chart, dir.path().join("out/btc.html"), ChartFormat::Html)
            .unwrap();
        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<svg"));
        assert!(html.contains("BTC/USD - Hour Chart"));

        let svg_path = viz
            .persist(&chart, dir.path().join("btc.svg"), ChartFormat::Svg)
            .unwrap();
        let svg = std::fs::read_to_string(&svg_path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("SMA 5"));
    }

    #[test]
    fn test_persist_multi() {
        let dir = tempfile::tempdir().unwrap();
        let viz = ChartVisualizer::default();
        let series = vec![
            (Timeframe::Hour, sample_candles(10)),
            (Timeframe::Day, sample_candles(5)),
        ];
        let multi = viz
            .render_multi_timeframe(&series, "BTC", "USD", Timeframe::Hour)
            .unwrap();

        let path = viz.persist_multi(&multi, dir.path().join("multi.html")).unwrap();
        let html = std::fs::read_to_string(path).unwrap();

        assert!(html.contains("<select"));
        assert!(html.contains("chart-hour"));
        assert!(html.contains("chart-day"));
    }

    #[test]
    fn test_browser_command_targets_file() {
        let path = Path::new("/tmp/btc_usd_hour_chart.html");
        let command = browser_command(path);

        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().copied(), Some(path.as_os_str()));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_launcher_waits_for_exit() {
        assert!(run_launcher(Command::new("true")).is_ok());
        assert!(matches!(run_launcher(Command::new("false")), Err(ChartError::Io(_))));
    }

    #[test]
    fn test_parse_format_and_theme() {
        assert_eq!("HTML".parse::<ChartFormat>().unwrap(), ChartFormat::Html);
        assert_eq!("svg".parse::<ChartFormat>().unwrap(), ChartFormat::Svg);
        assert!("png".parse::<ChartFormat>().is_err());
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("neon".parse::<Theme>().is_err());
    }
}
