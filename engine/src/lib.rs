// Engine library root
// Batch and streaming indicators, analytics, CSV ingestion and the async
// service used by the binary.

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod services;
pub mod streaming;

pub use error::{EngineError, Result};
