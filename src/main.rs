//! perpkit: trade setup and charting CLI.
//!
//! Sizes positions from a fixed max-loss budget and renders candlestick
//! charts from CryptoCompare market data.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use perp_toolkit::api::DEFAULT_HISTORY_LIMIT;
use perp_toolkit::chart::{ChartFormat, ChartOptions, ChartVisualizer, IndicatorSpec, Theme};
use perp_toolkit::{
    AppConfig, CryptoCompareClient, DataProvider, PositionCalculator, PriceQuote,
    SimpleStopLossStrategy, Strategy, Timeframe,
};

/// Crypto trade setup toolkit CLI.
#[derive(Parser)]
#[command(name = "perpkit")]
#[command(about = "Position sizing and candlestick charts for crypto pairs", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current price
    Price {
        /// Crypto symbol (defaults to DEFAULT_SYMBOL)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Quote currency (defaults to DEFAULT_CURRENCY)
        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Show price and 24h statistics
    Market {
        #[arg(short, long)]
        symbol: Option<String>,

        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Size a trade from the max-loss budget
    Setup {
        #[arg(short, long)]
        symbol: Option<String>,

        #[arg(short, long)]
        currency: Option<String>,

        /// Stop-loss price (default: configured percentage below price)
        #[arg(long, requires = "target")]
        stop_loss: Option<Decimal>,

        /// Target price (default: configured percentage above price)
        #[arg(long, requires = "stop_loss")]
        target: Option<Decimal>,

        /// Max loss per trade (defaults to MAX_LOSS_AMOUNT)
        #[arg(short, long)]
        max_loss: Option<Decimal>,
    },

    /// Render a candlestick chart with volume
    Chart {
        #[arg(short, long)]
        symbol: Option<String>,

        #[arg(short, long)]
        currency: Option<String>,

        /// Candle interval (minute, hour, day)
        #[arg(short, long, default_value = "hour")]
        timeframe: Timeframe,

        /// Number of candles to fetch
        #[arg(long, default_value = "168")]
        limit: u32,

        /// Moving averages to overlay, e.g. SMA_20,EMA_12
        #[arg(short, long, value_delimiter = ',')]
        indicators: Vec<IndicatorSpec>,

        /// Output file (default: <symbol>_<timeframe>_chart.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (html, svg)
        #[arg(short, long, default_value = "html")]
        format: ChartFormat,

        /// Hide the volume panel
        #[arg(long)]
        no_volume: bool,

        /// Color theme (dark, light)
        #[arg(long, default_value = "dark")]
        theme: Theme,

        /// Open the chart in the browser
        #[arg(long)]
        open: bool,
    },

    /// Render one document with a chart per timeframe
    MultiChart {
        #[arg(short, long)]
        symbol: Option<String>,

        #[arg(short, long)]
        currency: Option<String>,

        /// Timeframes to include
        #[arg(short, long, value_delimiter = ',', default_value = "hour,day")]
        timeframes: Vec<Timeframe>,

        /// Output file (default: <symbol>_multi_chart.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value = "dark")]
        theme: Theme,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AppConfig::from_env().context("Invalid configuration")?;
    let client = CryptoCompareClient::new(config.client_config())?;

    match cli.command {
        Commands::Price { symbol, currency } => {
            let (symbol, currency) = pair(&config, symbol, currency);

            let Some(price) = client.get_current_price(&symbol, &currency).await else {
                println!("Price unavailable for {}/{}", symbol, currency);
                return Ok(());
            };

            let quote = PriceQuote::new(&symbol, &currency, price);
            println!(
                "{}/{}: {} ({})",
                quote.symbol,
                quote.currency,
                quote.price,
                quote.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }

        Commands::Market { symbol, currency } => {
            let (symbol, currency) = pair(&config, symbol, currency);

            let Some(snap) = client.get_market_data(&symbol, &currency).await else {
                println!("Market data unavailable for {}/{}", symbol, currency);
                return Ok(());
            };

            println!("\n=== {}/{} ===", snap.symbol, snap.currency);
            println!("Price:        {:.2}", snap.price);
            println!("24h Change:   {}", fmt_opt(snap.change_24h, ""));
            println!("24h Change %: {}", fmt_opt(snap.change_pct_24h, "%"));
            println!("24h High:     {}", fmt_opt(snap.high_24h, ""));
            println!("24h Low:      {}", fmt_opt(snap.low_24h, ""));
            println!("24h Volume:   {}", fmt_opt(snap.volume_24h, ""));
            println!("Market Cap:   {}", fmt_opt(snap.market_cap, ""));
        }

        Commands::Setup {
            symbol,
            currency,
            stop_loss,
            target,
            max_loss,
        } => {
            let (symbol, currency) = pair(&config, symbol, currency);
            let max_loss = max_loss.unwrap_or(config.trading.max_loss_amount);
            let calculator = PositionCalculator::new(max_loss)?;

            info!(symbol = %symbol, currency = %currency, max_loss = %max_loss, "Calculating trade setup");

            let mut strategy = SimpleStopLossStrategy::new(&client, &calculator, &symbol, &currency)
                .with_default_band(
                    config.trading.default_stop_loss_pct,
                    config.trading.default_target_pct,
                );
            if let (Some(stop), Some(target)) = (stop_loss, target) {
                strategy.set_levels(stop, target);
            }

            let Some(setup) = strategy.execute_strategy().await else {
                println!("No trade setup: market data unavailable or invalid levels.");
                return Ok(());
            };
            let entry = &setup.entry.sizing;

            println!("{}", "=".repeat(50));
            println!("TRADE SETUP  {}/{}  ({})", symbol, currency, setup.timestamp);
            println!("{}", "=".repeat(50));
            println!("Action:         {} ({})", setup.entry.action.as_str(), entry.position_type.as_str());
            println!("Entry Price:    {:.2}", entry.current_price);
            println!("Stop Loss:      {:.2}", entry.stop_loss);
            println!("Target:         {:.2}", entry.target_price);
            println!("\nPosition Size:  {:.6} {}", entry.position_size, symbol);
            println!("Entry Cost:     {:.2}", entry.entry_cost);
            println!("\nMax Loss:       {:.2}", entry.potential_loss);
            println!("Potential Gain: {:.2}", entry.potential_profit);
            println!("Risk/Reward:    1:{:.2}", entry.risk_reward_ratio);
            println!("{}", "=".repeat(50));

            // Same numbers straight from the calculator, at the signal's levels.
            println!("\nDirect calculation:");
            println!("{}", "-".repeat(50));
            match calculator.calculate_position_size(
                setup.signal.current_price,
                setup.signal.stop_loss,
                setup.signal.target,
                None,
            ) {
                Ok(position) => {
                    println!("Position Size:    {:.6} {}", position.position_size, symbol);
                    println!("Max Loss:         {:.2}", position.potential_loss);
                    println!("Potential Profit: {:.2}", position.potential_profit);
                }
                Err(e) => println!("Sizing rejected: {}", e),
            }
        }

        Commands::Chart {
            symbol,
            currency,
            timeframe,
            limit,
            indicators,
            output,
            format,
            no_volume,
            theme,
            open,
        } => {
            let (symbol, currency) = pair(&config, symbol, currency);

            info!(symbol = %symbol, timeframe = %timeframe, limit = limit, "Fetching candles");

            let Some(candles) = client
                .get_historical_ohlcv(&symbol, &currency, timeframe, limit)
                .await
            else {
                println!("Failed to fetch {} data for {}/{}", timeframe, symbol, currency);
                return Ok(());
            };
            println!("Fetched {} {} candles", candles.len(), timeframe);

            let visualizer = ChartVisualizer::new(theme);
            let options = ChartOptions {
                timeframe,
                show_volume: !no_volume,
                ..ChartOptions::default()
            };
            let chart = visualizer.render(&candles, &symbol, &currency, &options)?;
            let chart = visualizer.overlay_indicators(chart, &candles, &indicators);

            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "{}_{}_chart.{}",
                    symbol.to_lowercase(),
                    timeframe,
                    format.extension()
                ))
            });
            let path = visualizer.persist(&chart, &output, format)?;
            println!("Chart saved to: {}", path.display());

            if open {
                visualizer.display(&chart)?;
            }
        }

        Commands::MultiChart {
            symbol,
            currency,
            timeframes,
            output,
            theme,
        } => {
            let (symbol, currency) = pair(&config, symbol, currency);

            let series = client
                .get_ohlcv_multi_timeframe(&symbol, &currency, &timeframes)
                .await;
            if series.is_empty() {
                println!("Failed to fetch multi-timeframe data for {}/{}", symbol, currency);
                return Ok(());
            }
            for (tf, candles) in &series {
                println!("  - {}: {} candles (limit {})", tf, candles.len(), DEFAULT_HISTORY_LIMIT);
            }

            let visualizer = ChartVisualizer::new(theme);
            let default_tf = timeframes.first().copied().unwrap_or(Timeframe::Hour);
            let multi = visualizer.render_multi_timeframe(&series, &symbol, &currency, default_tf)?;

            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!("{}_multi_chart.html", symbol.to_lowercase()))
            });
            let path = visualizer.persist_multi(&multi, &output)?;
            println!("Chart saved to: {}", path.display());
        }

        Commands::Config => {
            println!("\n=== Configuration ===\n");
            println!("Market Data:");
            println!(
                "  API Key:              {}",
                if config.api_key.is_some() { "set" } else { "not set" }
            );
            println!("  Default Symbol:       {}", config.default_symbol);
            println!("  Default Currency:     {}", config.default_currency);

            println!("\nRisk Management:");
            println!("  Max Loss Amount:      {}", config.trading.max_loss_amount);
            println!(
                "  Default Stop Loss:    {}%",
                config.trading.default_stop_loss_pct * Decimal::ONE_HUNDRED
            );
            println!(
                "  Default Target:       {}%",
                config.trading.default_target_pct * Decimal::ONE_HUNDRED
            );
        }
    }

    Ok(())
}

/// Resolve symbol/currency from CLI values or configured defaults.
fn pair(config: &AppConfig, symbol: Option<String>, currency: Option<String>) -> (String, String) {
    (
        symbol.unwrap_or_else(|| config.default_symbol.clone()).to_uppercase(),
        currency.unwrap_or_else(|| config.default_currency.clone()).to_uppercase(),
    )
}

fn fmt_opt(value: Option<Decimal>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.2}{}", v, suffix),
        None => "n/a".to_string(),
    }
}
