// Manages loaded bar series per symbol and timeframe
use crate::error::Result;
use chrono::{DateTime, Utc};
use shared::models::{Bar, BarSeries, TimeFrame};
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory bar storage.
///
/// Each `(symbol, timeframe)` holds an immutable `Arc<BarSeries>`. Writers
/// build a new series and swap it in, so a reader that already cloned the
/// `Arc` keeps a consistent snapshot while calculations run.
#[derive(Debug, Default)]
pub struct MarketDataStore {
    data: HashMap<String, HashMap<TimeFrame, Arc<BarSeries>>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `series` under its own symbol and timeframe, dropping whatever
    /// was there before. Returns the stored snapshot.
    pub fn replace_series(&mut self, series: BarSeries) -> Arc<BarSeries> {
        let snapshot = Arc::new(series);
        self.data
            .entry(snapshot.symbol().to_string())
            .or_default()
            .insert(snapshot.timeframe(), Arc::clone(&snapshot));
        snapshot
    }

    /// Merges `new_bars` into the stored series. On a timestamp collision the
    /// incoming bar wins.
    pub fn add_bars(&mut self, symbol: &str, timeframe: TimeFrame, new_bars: Vec<Bar>) -> Result<Arc<BarSeries>> {
        let mut merged: Vec<Bar> = self
            .get_series(symbol, timeframe)
            .map(|existing| existing.bars().to_vec())
            .unwrap_or_default();
        let existing_count = merged.len();
        merged.extend(new_bars);

        // from_unsorted keeps the last of each duplicate run, and the stable
        // sort leaves incoming bars after the stored ones.
        let series = BarSeries::from_unsorted(symbol, timeframe, merged)?;
        tracing::debug!(
            %symbol,
            %timeframe,
            previous = existing_count,
            total = series.len(),
            "Merged bars into store"
        );
        Ok(self.replace_series(series))
    }

    pub fn get_series(&self, symbol: &str, timeframe: TimeFrame) -> Option<Arc<BarSeries>> {
        self.data
            .get(symbol)
            .and_then(|symbol_data| symbol_data.get(&timeframe))
            .cloned()
    }

    /// Copies the bars inside an inclusive time range; either bound may be open.
    pub fn get_bars(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        from_timestamp: Option<DateTime<Utc>>,
        to_timestamp: Option<DateTime<Utc>>,
    ) -> Option<Vec<Bar>> {
        self.get_series(symbol, timeframe).map(|series| {
            series
                .bars()
                .iter()
                .filter(|b| from_timestamp.map_or(true, |start| b.timestamp >= start))
                .filter(|b| to_timestamp.map_or(true, |end| b.timestamp <= end))
                .cloned()
                .collect()
        })
    }

    /// Loaded `(symbol, timeframe)` keys, sorted by symbol then shortest timeframe.
    pub fn symbols(&self) -> Vec<(String, TimeFrame)> {
        let mut keys: Vec<(String, TimeFrame)> = self
            .data
            .iter()
            .flat_map(|(symbol, frames)| frames.keys().map(move |tf| (symbol.clone(), *tf)))
            .collect();
        keys.sort();
        keys
    }

    pub fn remove(&mut self, symbol: &str, timeframe: TimeFrame) -> Option<Arc<BarSeries>> {
        let frames = self.data.get_mut(symbol)?;
        let removed = frames.remove(&timeframe);
        if frames.is_empty() {
            self.data.remove(symbol);
        }
        removed
    }
}
