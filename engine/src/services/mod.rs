// Async service layer over the market data store and the indicator registry.
// Request and response types live here; the handlers are under
// indicator_service/.
use crate::data::csv_parser::CsvFormat;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::models::{Indicator, TimeFrame};
use std::str::FromStr;

pub mod indicator_service;

pub use indicator_service::IndicatorService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCsvRequest {
    pub file_path: String,
    pub symbol: String,
    pub timeframe: TimeFrame,
    /// Falls back to the configured format when absent.
    #[serde(default)]
    pub format: Option<CsvFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadCsvResponse {
    pub success: bool,
    pub message: String,
    pub bars_loaded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub indicator_type: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResponse {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub indicator: Indicator,
}

/// One entry of a multi-indicator request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub indicator_type: String,
    #[serde(default)]
    pub parameters: Value,
}

impl IndicatorSpec {
    pub fn new(indicator_type: impl Into<String>, parameters: Value) -> Self {
        Self { indicator_type: indicator_type.into(), parameters }
    }
}

// Accepts "rsi" or "bollinger:{\"period\":20,\"std_dev\":2}".
impl FromStr for IndicatorSpec {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, raw_params) = match s.split_once(':') {
            Some((name, params)) => (name.trim(), Some(params.trim())),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(EngineError::ProcessingError(format!("Missing indicator name in '{}'", s)));
        }
        let parameters = match raw_params {
            Some(raw) if !raw.is_empty() => serde_json::from_str(raw).map_err(|e| {
                EngineError::ProcessingError(format!("Invalid JSON parameters for indicator '{}': {}", name, e))
            })?,
            _ => Value::Null,
        };
        Ok(Self::new(name, parameters))
    }
}
