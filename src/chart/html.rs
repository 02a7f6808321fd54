//! Self-contained HTML documents wrapping the SVG charts.

use serde::Serialize;

use super::svg::{escape, render_svg};
use super::visualizer::{CandlePoint, Chart, MultiChart};
use super::ChartError;

const SCRIPT: &str = r#"
document.querySelectorAll('.chart').forEach(function (el) {
  var data = JSON.parse(el.querySelector('script.chart-data').textContent);
  var readout = el.querySelector('.readout');
  var cross = el.querySelector('.crosshair');
  el.querySelectorAll('g.candle').forEach(function (g) {
    g.addEventListener('mouseenter', function () {
      var c = data.candles[Number(g.dataset.i)];
      readout.textContent = c.timestamp + '   O ' + c.open + '   H ' + c.high +
        '   L ' + c.low + '   C ' + c.close + '   V ' + c.volume;
      cross.setAttribute('x1', g.dataset.x);
      cross.setAttribute('x2', g.dataset.x);
      cross.setAttribute('visibility', 'visible');
    });
  });
  el.addEventListener('mouseleave', function () {
    cross.setAttribute('visibility', 'hidden');
  });
});
var selector = document.getElementById('timeframe');
if (selector) {
  selector.addEventListener('change', function () {
    document.querySelectorAll('.chart').forEach(function (el) {
      el.style.display = el.id === 'chart-' + selector.value ? '' : 'none';
    });
  });
}
"#;

/// Data embedded next to each chart for the hover readout.
#[derive(Serialize)]
struct ChartData<'a> {
    symbol: &'a str,
    currency: &'a str,
    timeframe: &'a str,
    candles: &'a [CandlePoint],
}

pub(crate) fn chart_document(chart: &Chart) -> Result<String, ChartError> {
    let body = chart_section(chart, "chart", true)?;
    Ok(document(&chart.title, chart, "", &body))
}

pub(crate) fn multi_document(multi: &MultiChart) -> Result<String, ChartError> {
    let first = &multi.charts[multi.default_index];

    let mut options = String::new();
    let mut body = String::new();
    for (idx, chart) in multi.charts.iter().enumerate() {
        let tf = chart.timeframe.as_str();
        let selected = if idx == multi.default_index { " selected" } else { "" };
        options.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            tf,
            selected,
            tf.to_uppercase()
        ));

        let id = format!("chart-{}", tf);
        body.push_str(&chart_section(chart, &id, idx == multi.default_index)?);
    }

    let controls = format!(
        r#"<label for="timeframe">Timeframe </label><select id="timeframe">{}</select>"#,
        options
    );

    Ok(document(&multi.title, first, &controls, &body))
}

fn chart_section(chart: &Chart, id: &str, visible: bool) -> Result<String, ChartError> {
    let data = ChartData {
        symbol: &chart.symbol,
        currency: &chart.currency,
        timeframe: chart.timeframe.as_str(),
        candles: &chart.candles,
    };
    // "</" would close the script element early.
    let json = serde_json::to_string(&data)?.replace("</", "<\\/");
    let style = if visible { "" } else { r#" style="display:none""# };

    Ok(format!(
        "<div class=\"chart\" id=\"{id}\"{style}>\n<script type=\"application/json\" class=\"chart-data\">{json}</script>\n<div class=\"readout\">&nbsp;</div>\n{svg}</div>\n",
        id = id,
        style = style,
        json = json,
        svg = render_svg(chart, id),
    ))
}

fn document(title: &str, chart: &Chart, controls: &str, body: &str) -> String {
    let palette = chart.theme.palette();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\nbody {{ margin: 0; padding: 16px; background: {bg}; color: {fg}; font-family: Helvetica, Arial, sans-serif; }}\n.controls {{ margin-bottom: 8px; }}\n.readout {{ font-family: monospace; min-height: 1.4em; margin-bottom: 4px; }}\nselect {{ background: {bg}; color: {fg}; border: 1px solid {grid}; padding: 2px 6px; }}\ng.candle:hover {{ opacity: 0.8; }}\n</style>\n</head>\n<body>\n<div class=\"controls\">{controls}</div>\n{body}<script>{script}</script>\n</body>\n</html>\n",
        title = escape(title),
        bg = palette.background,
        fg = palette.text,
        grid = palette.grid,
        controls = controls,
        body = body,
        script = SCRIPT,
    )
}
