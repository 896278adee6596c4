// Handler for computing several indicators over one series snapshot
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;

use super::helpers::{from_join_error, series_snapshot};
use crate::config::EngineSettings;
use crate::data::market_data::MarketDataStore;
use crate::error::{EngineError, Result};
use crate::indicators::{build_calculator, default_calculators, IndicatorCalculator, IndicatorKind};
use crate::services::IndicatorSpec;
use shared::models::{Indicator, TimeFrame};

pub async fn handle_calculate_indicators(
    symbol: &str,
    timeframe: TimeFrame,
    specs: Vec<IndicatorSpec>,
    market_data_store: Arc<RwLock<MarketDataStore>>,
    settings: &EngineSettings,
) -> Result<Vec<Indicator>> {
    // Every spec is validated before any work is scheduled.
    let calculators: Vec<Box<dyn IndicatorCalculator>> = if specs.is_empty() {
        default_calculators(&settings.indicators)?
    } else {
        specs
            .iter()
            .map(|spec| {
                let kind: IndicatorKind = spec.indicator_type.parse()?;
                build_calculator(kind, &spec.parameters, &settings.indicators)
            })
            .collect::<Result<_>>()?
    };

    let series = series_snapshot(&market_data_store, symbol, timeframe).await?;
    let total = calculators.len();
    let semaphore = Arc::new(Semaphore::new(settings.max_parallel_indicators.max(1)));
    let mut join_set = JoinSet::new();

    for (index, calculator) in calculators.into_iter().enumerate() {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| EngineError::ProcessingError(format!("Indicator scheduler closed: {}", e)))?;
        let series = Arc::clone(&series);
        join_set.spawn_blocking(move || {
            let _permit = permit;
            (index, calculator.indicator(series.bars()))
        });
    }

    let mut slots: Vec<Option<Indicator>> = (0..total).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        let (index, indicator) = joined.map_err(from_join_error)?;
        slots[index] = Some(indicator);
    }

    let results = slots
        .into_iter()
        .collect::<Option<Vec<Indicator>>>()
        .ok_or_else(|| EngineError::ProcessingError("Indicator batch finished with missing results".to_string()))?;

    tracing::info!(%symbol, %timeframe, count = results.len(), bars = series.len(), "Calculated indicator batch");
    Ok(results)
}
