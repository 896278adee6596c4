// Engine configuration
pub mod settings;

pub use settings::{AnalyticsSettings, DataSettings, EngineSettings, IndicatorDefaults};
