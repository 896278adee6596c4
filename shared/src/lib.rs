pub mod models;

pub use models::{
    BandPoint, Bar, BarError, BarSeries, Indicator, IndicatorOutput, MacdPoint, TimeFrame,
};
