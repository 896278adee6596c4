// Engine settings, loaded from a JSON config file with environment overrides
use crate::data::csv_parser::CsvFormat;
use crate::error::{EngineError, Result};
use crate::indicators::EmaWarmup;
use serde::{Deserialize, Serialize};
use shared::models::TimeFrame;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub data: DataSettings,
    pub indicators: IndicatorDefaults,
    pub analytics: AnalyticsSettings,
    /// Upper bound on indicator jobs computed at once for a single request.
    pub max_parallel_indicators: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DataSettings {
    pub csv_format: CsvFormat,
    pub default_symbol: String,
    pub timeframe: TimeFrame,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct IndicatorDefaults {
    pub sma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ema_warmup: EmaWarmup,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Annual risk-free rate as a fraction (0.02 = 2%).
    pub risk_free_rate: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            data: DataSettings::default(),
            indicators: IndicatorDefaults::default(),
            analytics: AnalyticsSettings::default(),
            max_parallel_indicators: 4,
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            csv_format: CsvFormat::Standard,
            default_symbol: "UNKNOWN".to_string(),
            timeframe: TimeFrame::Day1,
        }
    }
}

impl Default for IndicatorDefaults {
    // Mirrors the chart's default overlays: SMA 20/50, EMA 12/26, RSI 14,
    // Bollinger 20/2 and MACD 12/26/9.
    fn default() -> Self {
        IndicatorDefaults {
            sma_periods: vec![20, 50],
            ema_periods: vec![12, 26],
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ema_warmup: EmaWarmup::Seeded,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        AnalyticsSettings { risk_free_rate: 0.02 }
    }
}

impl EngineSettings {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let settings: EngineSettings = serde_json::from_str(raw)
            .map_err(|e| EngineError::ConfigError(format!("Invalid settings JSON: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Failed to read settings file '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads from `path` when given, otherwise starts from defaults, then
    /// applies `ENGINE_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Applies overrides from a key lookup. Takes a closure so tests do not
    /// have to touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("ENGINE_CSV_FORMAT") {
            self.data.csv_format = raw.parse().map_err(EngineError::ConfigError)?;
        }
        if let Some(raw) = lookup("ENGINE_MAX_PARALLEL_INDICATORS") {
            self.max_parallel_indicators = raw.trim().parse().map_err(|e| {
                EngineError::ConfigError(format!("ENGINE_MAX_PARALLEL_INDICATORS '{}': {}", raw, e))
            })?;
        }
        if let Some(raw) = lookup("ENGINE_EMA_WARMUP") {
            self.indicators.ema_warmup = raw.parse().map_err(EngineError::ConfigError)?;
        }
        if let Some(raw) = lookup("ENGINE_RISK_FREE_RATE") {
            self.analytics.risk_free_rate = raw.trim().parse().map_err(|e| {
                EngineError::ConfigError(format!("ENGINE_RISK_FREE_RATE '{}': {}", raw, e))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let ind = &self.indicators;
        if ind.sma_periods.iter().chain(ind.ema_periods.iter()).any(|p| *p == 0)
            || ind.rsi_period == 0
            || ind.bollinger_period == 0
            || ind.macd_signal == 0
        {
            return Err(EngineError::ConfigError("Indicator periods must be greater than 0".to_string()));
        }
        if ind.macd_fast == 0 || ind.macd_fast >= ind.macd_slow {
            return Err(EngineError::ConfigError(format!(
                "MACD fast period ({}) must be positive and below the slow period ({})",
                ind.macd_fast, ind.macd_slow
            )));
        }
        if !ind.bollinger_std_dev.is_finite() || ind.bollinger_std_dev < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "Bollinger std_dev must be a non-negative number, got {}",
                ind.bollinger_std_dev
            )));
        }
        if self.max_parallel_indicators == 0 {
            return Err(EngineError::ConfigError("max_parallel_indicators must be at least 1".to_string()));
        }
        if !self.analytics.risk_free_rate.is_finite() {
            return Err(EngineError::ConfigError("risk_free_rate must be finite".to_string()));
        }
        Ok(())
    }
}
