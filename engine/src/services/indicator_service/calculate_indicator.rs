// Handler for a single indicator calculation
use std::sync::Arc;
use tokio::sync::RwLock;

use super::helpers::{from_join_error, series_snapshot};
use crate::config::EngineSettings;
use crate::data::market_data::MarketDataStore;
use crate::error::Result;
use crate::indicators::{build_calculator, IndicatorKind};
use crate::services::{IndicatorRequest, IndicatorResponse};

pub async fn handle_calculate_indicator(
    req_payload: IndicatorRequest,
    market_data_store: Arc<RwLock<MarketDataStore>>,
    settings: &EngineSettings,
) -> Result<IndicatorResponse> {
    tracing::debug!(symbol = %req_payload.symbol, indicator_type = %req_payload.indicator_type, "Handling IndicatorRequest in dedicated handler");

    let kind = req_payload.indicator_type.parse::<IndicatorKind>().map_err(|e| {
        tracing::error!(indicator_type = %req_payload.indicator_type, "Unknown indicator type requested");
        e
    })?;
    let calculator = build_calculator(kind, &req_payload.parameters, &settings.indicators)?;

    let series = series_snapshot(&market_data_store, &req_payload.symbol, req_payload.timeframe).await?;
    let bar_count = series.len();

    let indicator = tokio::task::spawn_blocking(move || calculator.indicator(series.bars()))
        .await
        .map_err(from_join_error)?;

    tracing::debug!(
        symbol = %req_payload.symbol,
        indicator = %indicator.name,
        bars = bar_count,
        undefined = indicator.output.undefined_prefix(),
        "Indicator calculated"
    );
    Ok(IndicatorResponse {
        symbol: req_payload.symbol,
        timeframe: req_payload.timeframe,
        indicator,
    })
}
