// Bollinger Bands indicator implementation
use super::sma::sma_values;
use super::{closes, IndicatorCalculator};
use crate::error::{EngineError, Result};
use serde_json::Value;
use shared::models::{BandPoint, Bar, IndicatorOutput};

pub const DEFAULT_BOLLINGER_PERIOD: usize = 20;
pub const DEFAULT_STD_DEV_MULTIPLIER: f64 = 2.0;

/// SMA-centred envelope at `k` population standard deviations.
///
/// The variance divides by `period`, not `period - 1`. Entries are `None`
/// wherever the SMA is undefined.
pub fn bollinger(bars: &[Bar], period: usize, k: f64) -> Vec<Option<BandPoint>> {
    bollinger_values(&closes(bars), period, k)
}

pub(crate) fn band_point(window: &[f64], middle: f64, k: f64) -> BandPoint {
    let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / window.len() as f64;
    let std = variance.sqrt();
    BandPoint {
        upper: middle + k * std,
        middle,
        lower: middle - k * std,
    }
}

pub(crate) fn bollinger_values(values: &[f64], period: usize, k: f64) -> Vec<Option<BandPoint>> {
    sma_values(values, period)
        .into_iter()
        .enumerate()
        .map(|(i, middle)| middle.map(|m| band_point(&values[i + 1 - period..=i], m, k)))
        .collect()
}

#[derive(Debug, Clone)]
pub struct BollingerBands {
    name: String,
    period: usize,
    std_dev: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev: f64) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("Bollinger period must be greater than 0".to_string()));
        }
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(EngineError::IndicatorError(format!(
                "Bollinger std_dev multiplier must be a non-negative number, got {}",
                std_dev
            )));
        }
        Ok(Self {
            name: format!("BB({},{})", period, std_dev),
            period,
            std_dev,
        })
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            name: format!("BB({},{})", DEFAULT_BOLLINGER_PERIOD, DEFAULT_STD_DEV_MULTIPLIER),
            period: DEFAULT_BOLLINGER_PERIOD,
            std_dev: DEFAULT_STD_DEV_MULTIPLIER,
        }
    }
}

impl IndicatorCalculator for BollingerBands {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "std_dev": self.std_dev })
    }

    fn warmup(&self) -> usize {
        self.period - 1
    }

    fn calculate(&self, data: &[Bar]) -> IndicatorOutput {
        IndicatorOutput::Bands(bollinger(data, self.period, self.std_dev))
    }
}
