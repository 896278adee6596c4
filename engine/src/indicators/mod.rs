// Technical indicators module
//
// Every indicator is a pure function of a bar slice: the output has one entry
// per input bar, `None` marks the warm-up region, and the input is never
// mutated.
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{bollinger, BollingerBands};
pub use ema::{ema, ema_with_warmup, Ema, EmaWarmup};
pub use macd::{macd, Macd};
pub use rsi::{rsi, Rsi};
pub use sma::{sma, Sma};

use crate::config::IndicatorDefaults;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::{Bar, Indicator, IndicatorOutput};
use std::fmt;
use std::str::FromStr;

// Common trait for all indicators
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value; // Parameters used for this indicator instance
    /// Number of leading entries left undefined on a long enough series.
    fn warmup(&self) -> usize;
    fn calculate(&self, data: &[Bar]) -> IndicatorOutput;

    fn indicator(&self, data: &[Bar]) -> Indicator {
        Indicator {
            name: self.name().to_string(),
            parameters: self.parameters(),
            output: self.calculate(data),
        }
    }
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Bollinger,
    Macd,
}

impl FromStr for IndicatorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "rsi" => Ok(IndicatorKind::Rsi),
            "bollinger" | "bb" | "bbands" => Ok(IndicatorKind::Bollinger),
            "macd" => Ok(IndicatorKind::Macd),
            _ => Err(EngineError::IndicatorError(format!("Unknown indicator type: {}", s))),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Bollinger => "bollinger",
            IndicatorKind::Macd => "macd",
        };
        f.write_str(name)
    }
}

fn read_usize(params: &Value, key: &str, default: usize) -> Result<usize> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| EngineError::IndicatorError(format!("Parameter '{}' must be a non-negative integer, got {}", key, v))),
    }
}

fn read_f64(params: &Value, key: &str, default: f64) -> Result<f64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| EngineError::IndicatorError(format!("Parameter '{}' must be a number, got {}", key, v))),
    }
}

fn read_warmup(params: &Value, default: EmaWarmup) -> Result<EmaWarmup> {
    match params.get("warmup") {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => s.parse().map_err(EngineError::IndicatorError),
        Some(v) => Err(EngineError::IndicatorError(format!("Parameter 'warmup' must be a string, got {}", v))),
    }
}

/// Builds a calculator from a kind and JSON parameters, falling back to the
/// configured defaults for missing keys.
pub fn build_calculator(
    kind: IndicatorKind,
    params: &Value,
    defaults: &IndicatorDefaults,
) -> Result<Box<dyn IndicatorCalculator>> {
    if !params.is_null() && !params.is_object() {
        return Err(EngineError::IndicatorError(format!(
            "Parameters for '{}' must be a JSON object, got {}",
            kind, params
        )));
    }

    let calculator: Box<dyn IndicatorCalculator> = match kind {
        IndicatorKind::Sma => {
            let default_period = defaults.sma_periods.first().copied().unwrap_or(20);
            Box::new(Sma::new(read_usize(params, "period", default_period)?)?)
        }
        IndicatorKind::Ema => {
            let default_period = defaults.ema_periods.first().copied().unwrap_or(12);
            let period = read_usize(params, "period", default_period)?;
            let warmup = read_warmup(params, defaults.ema_warmup)?;
            Box::new(Ema::with_warmup(period, warmup)?)
        }
        IndicatorKind::Rsi => Box::new(Rsi::new(read_usize(params, "period", defaults.rsi_period)?)?),
        IndicatorKind::Bollinger => {
            let period = read_usize(params, "period", defaults.bollinger_period)?;
            let std_dev = read_f64(params, "std_dev", defaults.bollinger_std_dev)?;
            Box::new(BollingerBands::new(period, std_dev)?)
        }
        IndicatorKind::Macd => {
            let fast = read_usize(params, "fast", defaults.macd_fast)?;
            let slow = read_usize(params, "slow", defaults.macd_slow)?;
            let signal = read_usize(params, "signal", defaults.macd_signal)?;
            Box::new(Macd::new(fast, slow, signal)?)
        }
    };
    Ok(calculator)
}

/// The overlay set computed when a caller does not name any indicator.
pub fn default_calculators(defaults: &IndicatorDefaults) -> Result<Vec<Box<dyn IndicatorCalculator>>> {
    let mut calculators: Vec<Box<dyn IndicatorCalculator>> = Vec::new();
    for &period in &defaults.sma_periods {
        calculators.push(Box::new(Sma::new(period)?));
    }
    for &period in &defaults.ema_periods {
        calculators.push(Box::new(Ema::with_warmup(period, defaults.ema_warmup)?));
    }
    calculators.push(Box::new(Rsi::new(defaults.rsi_period)?));
    calculators.push(Box::new(BollingerBands::new(defaults.bollinger_period, defaults.bollinger_std_dev)?));
    calculators.push(Box::new(Macd::new(defaults.macd_fast, defaults.macd_slow, defaults.macd_signal)?));
    Ok(calculators)
}
