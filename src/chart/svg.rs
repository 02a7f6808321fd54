//! SVG drawing for candlestick charts.

use super::indicators::IndicatorKind;
use super::visualizer::{CandlePoint, Chart, Palette};
use crate::models::Timeframe;

const MARGIN_LEFT: f64 = 16.0;
const MARGIN_RIGHT: f64 = 84.0;
const MARGIN_TOP: f64 = 72.0;
const MARGIN_BOTTOM: f64 = 40.0;

/// Share of the plot height given to the price panel when volume is shown.
const PRICE_PANEL_SHARE: f64 = 0.7;
const PANEL_GAP_SHARE: f64 = 0.03;

const PRICE_TICKS: usize = 5;
const TIME_TICKS: usize = 6;

const OVERLAY_COLORS: [&str; 6] = ["#f5b041", "#5dade2", "#af7ac5", "#f1948a", "#48c9b0", "#d4ac0d"];

/// Vertical band of the plot area.
#[derive(Debug, Clone, Copy)]
struct Panel {
    top: f64,
    height: f64,
    min: f64,
    max: f64,
}

impl Panel {
    fn y(&self, value: f64) -> f64 {
        self.top + (self.max - value) / (self.max - self.min) * self.height
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

pub(crate) fn overlay_color(index: usize) -> &'static str {
    OVERLAY_COLORS[index % OVERLAY_COLORS.len()]
}

/// Render `chart` as a standalone `<svg>` element.
///
/// `id` prefixes element ids so several charts can share one document.
pub(crate) fn render_svg(chart: &Chart, id: &str) -> String {
    let palette = chart.theme.palette();
    let width = chart.width as f64;
    let height = chart.height as f64;

    let plot_left = MARGIN_LEFT;
    let plot_width = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let plot_height = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);

    let overlays: Vec<Vec<Option<f64>>> = chart
        .overlays
        .iter()
        .map(|series| chart.aligned_overlay(series))
        .collect();

    let (price_height, volume_panel) = if chart.show_volume {
        let gap = plot_height * PANEL_GAP_SHARE;
        let usable = plot_height - gap;
        let price_height = usable * PRICE_PANEL_SHARE;
        let max_volume = chart
            .candles
            .iter()
            .map(|c| c.volume)
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let volume = Panel {
            top: MARGIN_TOP + price_height + gap,
            height: usable - price_height,
            min: 0.0,
            max: if max_volume > 0.0 { max_volume } else { 1.0 },
        };
        (price_height, Some(volume))
    } else {
        (plot_height, None)
    };

    let (min, max) = price_range(&chart.candles, &overlays);
    let price = Panel {
        top: MARGIN_TOP,
        height: price_height,
        min,
        max,
    };

    let n = chart.candles.len().max(1);
    let slot = plot_width / n as f64;
    let body_width = (slot * 0.7).max(1.0);
    let x_at = |i: usize| plot_left + (i as f64 + 0.5) * slot;

    let mut out = String::new();
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" id="{id}-svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif" font-size="12">"#,
        id = id,
        w = chart.width,
        h = chart.height
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<rect width="100%" height="100%" fill="{}"/>"#,
        palette.background
    ));
    out.push('\n');

    // Title
    out.push_str(&format!(
        r#"<text x="{:.1}" y="30" text-anchor="middle" font-size="20" fill="{}">{}</text>"#,
        width / 2.0,
        palette.text,
        escape(&chart.title)
    ));
    out.push('\n');

    push_legend(&mut out, chart, &palette, plot_left);
    push_price_axis(&mut out, chart, &palette, &price, plot_left, plot_width);

    // Candles
    for (i, candle) in chart.candles.iter().enumerate() {
        let color = if candle.is_bullish() {
            palette.increasing
        } else {
            palette.decreasing
        };
        let x = x_at(i);
        let body_top = price.y(candle.open.max(candle.close));
        let body_height = (price.y(candle.open.min(candle.close)) - body_top).max(1.0);

        out.push_str(&format!(
            r#"<g class="candle" data-i="{i}" data-x="{x:.2}"><title>{tip}</title><line x1="{x:.2}" y1="{hi:.2}" x2="{x:.2}" y2="{lo:.2}" stroke="{c}"/><rect x="{bx:.2}" y="{by:.2}" width="{bw:.2}" height="{bh:.2}" fill="{c}"/></g>"#,
            i = i,
            x = x,
            tip = escape(&tooltip(candle, chart.timeframe)),
            hi = price.y(candle.high),
            lo = price.y(candle.low),
            c = color,
            bx = x - body_width / 2.0,
            by = body_top,
            bw = body_width,
            bh = body_height,
        ));
        out.push('\n');
    }

    // Indicator lines
    for (idx, (series, values)) in chart.overlays.iter().zip(&overlays).enumerate() {
        let d = line_path(values, &x_at, &price);
        if d.is_empty() {
            continue;
        }
        let dash = match series.kind {
            IndicatorKind::Sma => "",
            IndicatorKind::Ema => r#" stroke-dasharray="6 4""#,
        };
        out.push_str(&format!(
            r#"<path class="indicator" d="{}" fill="none" stroke="{}" stroke-width="1.5"{}><title>{}</title></path>"#,
            d,
            overlay_color(idx),
            dash,
            escape(&series.name)
        ));
        out.push('\n');
    }

    if let Some(volume) = volume_panel {
        push_volume(&mut out, chart, &palette, &volume, &x_at, body_width, plot_left, plot_width);
    }

    let bottom = volume_panel.map(|v| v.bottom()).unwrap_or(price.bottom());
    push_time_axis(&mut out, chart, &palette, &x_at, bottom);

    // Hover crosshair, positioned by the HTML document script
    out.push_str(&format!(
        r#"<line class="crosshair" x1="0" y1="{:.2}" x2="0" y2="{:.2}" stroke="{}" stroke-dasharray="3 3" visibility="hidden"/>"#,
        MARGIN_TOP,
        bottom,
        palette.text
    ));
    out.push_str("\n</svg>\n");

    out
}

fn price_range(candles: &[CandlePoint], overlays: &[Vec<Option<f64>>]) -> (f64, f64) {
    let values = candles
        .iter()
        .flat_map(|c| [c.low, c.high])
        .chain(overlays.iter().flatten().flatten().copied())
        .filter(|v| v.is_finite());

    let (mut min, mut max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max <= min {
        min -= 1.0;
        max += 1.0;
    }

    let pad = (max - min) * 0.02;
    (min - pad, max + pad)
}

fn push_legend(out: &mut String, chart: &Chart, palette: &Palette, left: f64) {
    let y = 54.0;
    let mut x = left;

    out.push_str(&format!(
        r#"<rect x="{:.1}" y="{:.1}" width="10" height="10" fill="{}"/><text x="{:.1}" y="{:.1}" fill="{}">Price</text>"#,
        x,
        y - 9.0,
        palette.increasing,
        x + 14.0,
        y,
        palette.text
    ));
    x += 70.0;

    for (idx, series) in chart.overlays.iter().enumerate() {
        out.push_str(&format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/><text x="{:.1}" y="{:.1}" fill="{}">{}</text>"#,
            x,
            y - 4.0,
            x + 16.0,
            y - 4.0,
            overlay_color(idx),
            x + 20.0,
            y,
            palette.text,
            escape(&series.name)
        ));
        x += 90.0;
    }
    out.push('\n');
}

fn push_price_axis(
    out: &mut String,
    chart: &Chart,
    palette: &Palette,
    panel: &Panel,
    left: f64,
    width: f64,
) {
    for k in 0..PRICE_TICKS {
        let value = panel.min + (panel.max - panel.min) * k as f64 / (PRICE_TICKS - 1) as f64;
        let y = panel.y(value);
        out.push_str(&format!(
            r#"<line x1="{:.1}" y1="{y:.2}" x2="{:.1}" y2="{y:.2}" stroke="{}"/><text x="{:.1}" y="{:.2}" fill="{}">{}</text>"#,
            left,
            left + width,
            palette.grid,
            left + width + 6.0,
            y + 4.0,
            palette.text,
            format_price(value),
            y = y,
        ));
        out.push('\n');
    }

    let x = left + width + MARGIN_RIGHT - 10.0;
    let y = panel.top + panel.height / 2.0;
    out.push_str(&format!(
        r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle" fill="{}" transform="rotate(-90 {x:.1} {y:.1})">Price ({})</text>"#,
        palette.text,
        escape(&chart.currency),
        x = x,
        y = y,
    ));
    out.push('\n');
}

#[allow(clippy::too_many_arguments)]
fn push_volume(
    out: &mut String,
    chart: &Chart,
    palette: &Palette,
    panel: &Panel,
    x_at: &dyn Fn(usize) -> f64,
    body_width: f64,
    left: f64,
    width: f64,
) {
    out.push_str(&format!(
        r#"<line x1="{:.1}" y1="{:.2}" x2="{:.1}" y2="{:.2}" stroke="{}"/><text x="{:.1}" y="{:.2}" fill="{}">{}</text>"#,
        left,
        panel.top,
        left + width,
        panel.top,
        palette.grid,
        left + width + 6.0,
        panel.top + 4.0,
        palette.text,
        format_volume(panel.max)
    ));
    out.push('\n');

    for (i, candle) in chart.candles.iter().enumerate() {
        if !candle.volume.is_finite() || candle.volume <= 0.0 {
            continue;
        }
        let color = if candle.is_bullish() {
            palette.volume_increasing
        } else {
            palette.volume_decreasing
        };
        let top = panel.y(candle.volume);
        out.push_str(&format!(
            r#"<rect class="volume" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x_at(i) - body_width / 2.0,
            top,
            body_width,
            panel.bottom() - top,
            color
        ));
        out.push('\n');
    }

    let x = left + width + MARGIN_RIGHT - 10.0;
    let y = panel.top + panel.height / 2.0;
    out.push_str(&format!(
        r#"<text x="{x:.1}" y="{y:.1}" text-anchor="middle" fill="{}" transform="rotate(-90 {x:.1} {y:.1})">Volume ({})</text>"#,
        palette.text,
        escape(&chart.currency),
        x = x,
        y = y,
    ));
    out.push('\n');
}

fn push_time_axis(
    out: &mut String,
    chart: &Chart,
    palette: &Palette,
    x_at: &dyn Fn(usize) -> f64,
    bottom: f64,
) {
    let n = chart.candles.len();
    if n == 0 {
        return;
    }

    let ticks = TIME_TICKS.min(n);
    let mut last = None;
    for k in 0..ticks {
        let i = if ticks == 1 { 0 } else { k * (n - 1) / (ticks - 1) };
        if last == Some(i) {
            continue;
        }
        last = Some(i);

        out.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" fill="{}">{}</text>"#,
            x_at(i),
            bottom + 20.0,
            palette.text,
            format_time(&chart.candles[i], chart.timeframe)
        ));
        out.push('\n');
    }
}

/// SVG path through defined values, broken at gaps.
fn line_path(values: &[Option<f64>], x_at: &dyn Fn(usize) -> f64, panel: &Panel) -> String {
    let mut d = String::new();
    let mut pen_down = false;

    for (i, value) in values.iter().enumerate() {
        match value.filter(|v| v.is_finite()) {
            Some(v) => {
                let cmd = if pen_down { 'L' } else { 'M' };
                if !d.is_empty() {
                    d.push(' ');
                }
                d.push_str(&format!("{}{:.2},{:.2}", cmd, x_at(i), panel.y(v)));
                pen_down = true;
            }
            None => pen_down = false,
        }
    }

    d
}

fn tooltip(candle: &CandlePoint, timeframe: Timeframe) -> String {
    format!(
        "{}\nOpen: {}\nHigh: {}\nLow: {}\nClose: {}\nVolume: {}",
        format_time(candle, timeframe),
        format_price(candle.open),
        format_price(candle.high),
        format_price(candle.low),
        format_price(candle.close),
        format_volume(candle.volume)
    )
}

fn format_time(candle: &CandlePoint, timeframe: Timeframe) -> String {
    let pattern = match timeframe {
        Timeframe::Minute | Timeframe::Hour => "%m-%d %H:%M",
        Timeframe::Day => "%Y-%m-%d",
    };
    candle.timestamp.format(pattern).to_string()
}

pub(crate) fn format_price(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1000.0 {
        format!("{:.0}", value)
    } else if abs >= 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.6}", value)
    }
}

fn format_volume(value: f64) -> String {
    if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{:.2}", value)
    }
}

/// Escape text for XML content and attribute values.
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
