// Relative Strength Index (RSI) indicator implementation
use super::{closes, IndicatorCalculator};
use crate::error::{EngineError, Result};
use serde_json::Value;
use shared::models::{Bar, IndicatorOutput};

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// RSI from simple (not Wilder-smoothed) averages of gains and losses over
/// the trailing `period` close-to-close changes.
///
/// The output is aligned with `bars`: the first `period` entries are `None`
/// and the first value sits at index `period`.
pub fn rsi(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    rsi_values(&closes(bars), period)
}

/// `100 - 100 / (1 + avg_gain / avg_loss)`, reporting 100 whenever the window
/// has no losses. A flat window (no gains either) therefore also reads 100.
pub(crate) fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

pub(crate) fn gain_loss(change: f64) -> (f64, f64) {
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, -change)
    }
}

pub(crate) fn rsi_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut results = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return results;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|pair| gain_loss(pair[1] - pair[0]))
        .unzip();

    // Change index j covers bars j and j + 1, so its value lands on bar j + 1.
    for j in (period - 1)..gains.len() {
        let start = j + 1 - period;
        let avg_gain = gains[start..=j].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[start..=j].iter().sum::<f64>() / period as f64;
        results[j + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    results
}

#[derive(Debug, Clone)]
pub struct Rsi {
    name: String,
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("RSI period must be greater than 0".to_string()));
        }
        Ok(Self {
            name: format!("RSI({})", period),
            period,
        })
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self {
            name: format!("RSI({})", DEFAULT_RSI_PERIOD),
            period: DEFAULT_RSI_PERIOD,
        }
    }
}

impl IndicatorCalculator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn calculate(&self, data: &[Bar]) -> IndicatorOutput {
        IndicatorOutput::Line(rsi(data, self.period))
    }
}
