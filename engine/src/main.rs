// Engine command-line entry point
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use engine::config::EngineSettings;
use engine::data::csv_parser::CsvFormat;
use engine::data::market_data::MarketDataStore;
use engine::services::{IndicatorService, IndicatorSpec, LoadCsvRequest};
use serde::Serialize;
use shared::models::{Indicator, TimeFrame};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Technical indicator engine over OHLCV CSV files
#[derive(Parser, Debug)]
#[command(name = "engine", version, about = "Compute technical indicators and performance metrics from OHLCV CSV data")]
struct Cli {
    /// JSON settings file (environment overrides still apply)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute indicators and print them as JSON
    Indicators {
        #[command(flatten)]
        input: InputArgs,

        /// Indicator to compute, as `name` or `name:{json params}`. Repeatable.
        /// Without any, the configured default set is computed.
        #[arg(short, long = "indicator")]
        indicators: Vec<IndicatorSpec>,
    },
    /// Print return, volatility, Sharpe ratio and drawdown as JSON
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Input CSV file
    csv: PathBuf,

    /// CSV layout: standard or brazilian
    #[arg(short, long)]
    format: Option<CsvFormat>,

    /// Symbol to load (defaults to the configured symbol)
    #[arg(short, long)]
    symbol: Option<String>,

    /// Bar interval, e.g. 5m, 1h, 1d
    #[arg(short, long)]
    timeframe: Option<TimeFrame>,
}

#[derive(Serialize)]
struct IndicatorReport {
    symbol: String,
    timeframe: TimeFrame,
    timestamps: Vec<i64>,
    indicators: Vec<Indicator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = EngineSettings::load(cli.config.as_deref()).context("Failed to load engine settings")?;
    info!(max_parallel = settings.max_parallel_indicators, "Starting indicator engine...");

    let market_data_store = Arc::new(RwLock::new(MarketDataStore::new()));
    let service = IndicatorService::new(market_data_store, settings);

    match cli.command {
        Command::Indicators { input, indicators } => {
            let (symbol, timeframe) = load_input(&service, input).await?;
            let results = service.calculate_indicators(&symbol, timeframe, indicators).await?;

            let store = service.market_data_store();
            let timestamps = store
                .read()
                .await
                .get_series(&symbol, timeframe)
                .map(|series| series.bars().iter().map(|b| b.timestamp.timestamp_millis()).collect())
                .unwrap_or_default();

            let report = IndicatorReport { symbol, timeframe, timestamps, indicators: results };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Summary { input } => {
            let (symbol, timeframe) = load_input(&service, input).await?;
            let summary = service.performance_summary(&symbol, timeframe).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

async fn load_input(service: &IndicatorService, input: InputArgs) -> anyhow::Result<(String, TimeFrame)> {
    let symbol = input.symbol.unwrap_or_else(|| service.settings().data.default_symbol.clone());
    let timeframe = input.timeframe.unwrap_or(service.settings().data.timeframe);
    let file_path = input.csv.to_string_lossy().into_owned();

    let response = service
        .load_csv_data(LoadCsvRequest { file_path: file_path.clone(), symbol: symbol.clone(), timeframe, format: input.format })
        .await
        .with_context(|| format!("Failed to load '{}'", file_path))?;
    info!(%symbol, %timeframe, bars = response.bars_loaded, "{}", response.message);

    Ok((symbol, timeframe))
}
