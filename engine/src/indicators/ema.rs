// Exponential Moving Average (EMA) indicator implementation
use super::{closes, IndicatorCalculator};
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::{Bar, IndicatorOutput};
use std::fmt;
use std::str::FromStr;

/// How the leading EMA entries are reported.
///
/// The recurrence is seeded from the first close, so a value exists at every
/// index. `Seeded` reports all of them; `Withheld` hides the first
/// `period - 1` entries to share the warm-up convention of SMA, RSI and
/// Bollinger Bands. The defined values are identical in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmaWarmup {
    #[default]
    Seeded,
    Withheld,
}

impl FromStr for EmaWarmup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "seeded" => Ok(EmaWarmup::Seeded),
            "withheld" => Ok(EmaWarmup::Withheld),
            other => Err(format!("Unknown EMA warm-up mode '{}'. Use 'seeded' or 'withheld'.", other)),
        }
    }
}

impl fmt::Display for EmaWarmup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmaWarmup::Seeded => f.write_str("seeded"),
            EmaWarmup::Withheld => f.write_str("withheld"),
        }
    }
}

pub(crate) fn ema_multiplier(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// EMA of `close`, seeded from the first close, with every index defined.
///
/// For `period >= 1` this never yields `None`; only `period == 0` does.
pub fn ema(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    ema_with_warmup(bars, period, EmaWarmup::Seeded)
}

pub fn ema_with_warmup(bars: &[Bar], period: usize, warmup: EmaWarmup) -> Vec<Option<f64>> {
    ema_values(&closes(bars), period, warmup)
}

pub(crate) fn ema_values(values: &[f64], period: usize, warmup: EmaWarmup) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let multiplier = ema_multiplier(period);
    let hidden = match warmup {
        EmaWarmup::Seeded => 0,
        EmaWarmup::Withheld => period - 1,
    };

    let mut results = Vec::with_capacity(values.len());
    let mut previous_ema: Option<f64> = None;
    for (i, &value) in values.iter().enumerate() {
        let ema = match previous_ema {
            None => value,
            Some(prev) => (value - prev) * multiplier + prev,
        };
        previous_ema = Some(ema);
        results.push(if i < hidden { None } else { Some(ema) });
    }
    results
}

#[derive(Debug, Clone)]
pub struct Ema {
    name: String,
    period: usize,
    warmup: EmaWarmup,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self> {
        Self::with_warmup(period, EmaWarmup::Seeded)
    }

    pub fn with_warmup(period: usize, warmup: EmaWarmup) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("EMA period must be greater than 0".to_string()));
        }
        Ok(Self {
            name: format!("EMA({})", period),
            period,
            warmup,
        })
    }
}

impl IndicatorCalculator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "warmup": self.warmup.to_string() })
    }

    fn warmup(&self) -> usize {
        match self.warmup {
            EmaWarmup::Seeded => 0,
            EmaWarmup::Withheld => self.period - 1,
        }
    }

    fn calculate(&self, data: &[Bar]) -> IndicatorOutput {
        IndicatorOutput::Line(ema_with_warmup(data, self.period, self.warmup))
    }
}
