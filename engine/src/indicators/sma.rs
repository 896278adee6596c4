// Simple Moving Average (SMA) indicator implementation
use super::{closes, IndicatorCalculator};
use crate::error::{EngineError, Result};
use serde_json::Value;
use shared::models::{Bar, IndicatorOutput};

/// Arithmetic mean of `close` over the trailing `period` bars.
///
/// Entries before `period - 1` are `None`. A period longer than the series
/// (or zero) yields an all-`None` series of the same length.
pub fn sma(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    sma_values(&closes(bars), period)
}

pub(crate) fn sma_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let mut results = vec![None; period - 1];
    results.extend(
        values
            .windows(period)
            .map(|window| Some(window.iter().sum::<f64>() / period as f64)),
    );
    results
}

#[derive(Debug, Clone)]
pub struct Sma {
    name: String,
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("SMA period must be greater than 0".to_string()));
        }
        Ok(Self {
            name: format!("SMA({})", period),
            period,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl IndicatorCalculator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn calculate(&self, data: &[Bar]) -> IndicatorOutput {
        IndicatorOutput::Line(sma(data, self.period))
    }
}
