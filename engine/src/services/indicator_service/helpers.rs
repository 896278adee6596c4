// Helper functions shared by the indicator_service handlers
use crate::data::market_data::MarketDataStore;
use crate::error::{EngineError, Result};
use shared::models::{BarSeries, TimeFrame};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinError;

/// Clones the stored snapshot and releases the read lock before returning.
/// Unknown keys are a `MarketDataError`; an empty series is returned as is.
pub async fn series_snapshot(
    market_data_store: &Arc<RwLock<MarketDataStore>>,
    symbol: &str,
    timeframe: TimeFrame,
) -> Result<Arc<BarSeries>> {
    let store = market_data_store.read().await;
    let series = store.get_series(symbol, timeframe);
    drop(store);

    match series {
        None => {
            tracing::warn!(%symbol, %timeframe, "No market data loaded for request");
            Err(EngineError::MarketDataError(format!(
                "Market data for symbol '{}' and timeframe {} not found",
                symbol, timeframe
            )))
        }
        Some(series) => Ok(series),
    }
}

pub fn from_join_error(e: JoinError) -> EngineError {
    tracing::error!(error_detail = ?e, "Blocking indicator task did not complete");
    EngineError::ProcessingError(format!("Indicator task failed: {}", e))
}
