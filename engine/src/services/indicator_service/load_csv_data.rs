// Handler for loading a CSV file into the market data store
use std::sync::Arc;
use tokio::sync::RwLock;

use super::helpers::from_join_error;
use crate::config::EngineSettings;
use crate::data::csv_parser::BarCsvParser;
use crate::data::market_data::MarketDataStore;
use crate::error::Result;
use crate::services::{LoadCsvRequest, LoadCsvResponse};

pub async fn handle_load_csv_data(
    req_payload: LoadCsvRequest,
    market_data_store: Arc<RwLock<MarketDataStore>>,
    settings: &EngineSettings,
) -> Result<LoadCsvResponse> {
    let format = req_payload.format.unwrap_or(settings.data.csv_format);
    let timeframe = req_payload.timeframe;

    // File reads and parsing stay off the async workers.
    let path = req_payload.file_path.clone();
    let symbol = req_payload.symbol.clone();
    let parsed = tokio::task::spawn_blocking(move || BarCsvParser::load_series(&path, &symbol, timeframe, format))
        .await
        .map_err(from_join_error)?;

    let series = match parsed {
        Ok(series) => series,
        Err(e) => {
            tracing::error!(
                symbol = %req_payload.symbol,
                path = %req_payload.file_path,
                %format,
                error_detail = %e,
                "Failed to load CSV data"
            );
            return Err(e);
        }
    };

    let bars_loaded = series.len();
    let mut store = market_data_store.write().await;
    let stored = store.add_bars(&req_payload.symbol, timeframe, series.into_bars())?;
    drop(store);

    tracing::info!(
        symbol = %req_payload.symbol,
        %timeframe,
        count = bars_loaded,
        total = stored.len(),
        "Successfully loaded and stored CSV data"
    );
    Ok(LoadCsvResponse {
        success: true,
        message: format!("Loaded {} bars for symbol {}", bars_loaded, req_payload.symbol),
        bars_loaded,
    })
}
