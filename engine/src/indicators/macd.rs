// Moving Average Convergence/Divergence (MACD) indicator implementation
use super::ema::{ema_values, EmaWarmup};
use super::{closes, IndicatorCalculator};
use crate::error::{EngineError, Result};
use serde_json::Value;
use shared::models::{Bar, IndicatorOutput, MacdPoint};

/// MACD line (fast EMA minus slow EMA), its signal EMA and the histogram.
///
/// Both EMAs use the first-close seed. Values before the slow EMA's warm-up
/// (`slow - 1`) are `None`; the signal EMA is seeded on the first reported
/// MACD value.
pub fn macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> Vec<Option<MacdPoint>> {
    let values = closes(bars);
    if fast == 0 || signal == 0 || fast >= slow || values.len() < slow {
        return vec![None; values.len()];
    }

    let fast_ema = ema_values(&values, fast, EmaWarmup::Seeded);
    let slow_ema = ema_values(&values, slow, EmaWarmup::Seeded);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .skip(slow - 1)
        .filter_map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let signal_line = ema_values(&line, signal, EmaWarmup::Seeded);

    let mut results = vec![None; slow - 1];
    results.extend(line.iter().zip(signal_line.iter()).map(|(&macd, sig)| {
        sig.map(|signal| MacdPoint {
            macd,
            signal,
            histogram: macd - signal,
        })
    }));
    results
}

#[derive(Debug, Clone)]
pub struct Macd {
    name: String,
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self> {
        if fast == 0 || slow == 0 || signal == 0 {
            return Err(EngineError::IndicatorError("MACD periods must be greater than 0".to_string()));
        }
        if fast >= slow {
            return Err(EngineError::IndicatorError(format!(
                "MACD fast period ({}) must be below the slow period ({})",
                fast, slow
            )));
        }
        Ok(Self {
            name: format!("MACD({},{},{})", fast, slow, signal),
            fast,
            slow,
            signal,
        })
    }
}

impl IndicatorCalculator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "fast": self.fast, "slow": self.slow, "signal": self.signal })
    }

    fn warmup(&self) -> usize {
        self.slow - 1
    }

    fn calculate(&self, data: &[Bar]) -> IndicatorOutput {
        IndicatorOutput::Macd(macd(data, self.fast, self.slow, self.signal))
    }
}
