use shared::models::BarError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("Market data store error: {0}")]
    MarketDataError(String),

    #[error("Indicator calculation error: {0}")]
    IndicatorError(String),

    #[error("Invalid bar series: {source}")]
    InvalidSeries {
        #[from]
        source: BarError,
    },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Internal processing error: {0}")]
    ProcessingError(String),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),
}

impl EngineError {
    /// True for lookups of a symbol/timeframe the store has never seen.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::MarketDataError(msg) if msg.to_lowercase().contains("not found"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
