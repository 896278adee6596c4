// Handler for the risk/performance summary of a stored series
use std::sync::Arc;
use tokio::sync::RwLock;

use super::helpers::series_snapshot;
use crate::analytics::PerformanceSummary;
use crate::config::EngineSettings;
use crate::data::market_data::MarketDataStore;
use crate::error::Result;
use shared::models::TimeFrame;

pub async fn handle_performance_summary(
    symbol: &str,
    timeframe: TimeFrame,
    market_data_store: Arc<RwLock<MarketDataStore>>,
    settings: &EngineSettings,
) -> Result<PerformanceSummary> {
    let series = series_snapshot(&market_data_store, symbol, timeframe).await?;
    let summary = PerformanceSummary::from_series(&series, settings.analytics.risk_free_rate);
    tracing::debug!(
        %symbol,
        %timeframe,
        total_return = ?summary.total_return,
        max_drawdown = summary.max_drawdown,
        "Computed performance summary"
    );
    Ok(summary)
}
