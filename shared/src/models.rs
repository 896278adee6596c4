use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One OHLCV sample for a fixed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarError {
    #[error("bar at {timestamp} has a non-finite or negative {field}: {value}")]
    InvalidPrice {
        timestamp: DateTime<Utc>,
        field: &'static str,
        value: f64,
    },

    #[error("bar at {timestamp} violates low <= open/close <= high (o={open} h={high} l={low} c={close})")]
    InconsistentRange {
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("bar {index} in series is invalid: {source}")]
    InvalidBar {
        index: usize,
        #[source]
        source: Box<BarError>,
    },

    #[error("bar {index} at {timestamp} is not after the previous bar ({previous})")]
    OutOfOrder {
        index: usize,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self { timestamp, open, high, low, close, volume }
    }

    /// Checks the OHLC invariant: prices are finite, non-negative and
    /// `low <= min(open, close) <= max(open, close) <= high`.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BarError::InvalidPrice { timestamp: self.timestamp, field, value });
            }
        }

        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Err(BarError::InconsistentRange {
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Sampling interval of a bar series. Serialised with the same `1m`..`1M`
/// spelling that `FromStr` accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum TimeFrame {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Month1,
}

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const TRADING_MINUTES_PER_DAY: f64 = 390.0;

impl TimeFrame {
    /// Number of bars of this timeframe in a trading year, used to annualise
    /// per-bar statistics.
    pub fn periods_per_year(&self) -> f64 {
        let minutes = match self {
            TimeFrame::Day1 => return TRADING_DAYS_PER_YEAR,
            TimeFrame::Week1 => return 52.0,
            TimeFrame::Month1 => return 12.0,
            TimeFrame::Minute1 => 1.0,
            TimeFrame::Minute5 => 5.0,
            TimeFrame::Minute15 => 15.0,
            TimeFrame::Minute30 => 30.0,
            TimeFrame::Hour1 => 60.0,
            TimeFrame::Hour4 => 240.0,
        };
        TRADING_DAYS_PER_YEAR * TRADING_MINUTES_PER_DAY / minutes
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Minute1 => "1m",
            TimeFrame::Minute5 => "5m",
            TimeFrame::Minute15 => "15m",
            TimeFrame::Minute30 => "30m",
            TimeFrame::Hour1 => "1h",
            TimeFrame::Hour4 => "4h",
            TimeFrame::Day1 => "1d",
            TimeFrame::Week1 => "1w",
            TimeFrame::Month1 => "1M",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    // "1m" is one minute and "1M" one month, so matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(TimeFrame::Minute1),
            "5m" => Ok(TimeFrame::Minute5),
            "15m" => Ok(TimeFrame::Minute15),
            "30m" => Ok(TimeFrame::Minute30),
            "1h" => Ok(TimeFrame::Hour1),
            "4h" => Ok(TimeFrame::Hour4),
            "1d" => Ok(TimeFrame::Day1),
            "1w" => Ok(TimeFrame::Week1),
            "1M" => Ok(TimeFrame::Month1),
            other => Err(format!("Unknown timeframe '{}'", other)),
        }
    }
}

impl TryFrom<String> for TimeFrame {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeFrame> for String {
    fn from(timeframe: TimeFrame) -> Self {
        timeframe.as_str().to_string()
    }
}

/// Immutable, validated bar history for one symbol and timeframe.
///
/// Bars are strictly ascending by timestamp. A series is never mutated in
/// place; new data produces a new series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    symbol: String,
    timeframe: TimeFrame,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, timeframe: TimeFrame, bars: Vec<Bar>) -> Result<Self, BarError> {
        for (index, bar) in bars.iter().enumerate() {
            bar.validate()
                .map_err(|e| BarError::InvalidBar { index, source: Box::new(e) })?;
        }
        for (index, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(BarError::OutOfOrder {
                    index: index + 1,
                    timestamp: pair[1].timestamp,
                    previous: pair[0].timestamp,
                });
            }
        }
        Ok(Self { symbol: symbol.into(), timeframe, bars })
    }

    /// Sorts by timestamp and collapses duplicate timestamps before
    /// validating. When two bars share a timestamp the later one in `bars`
    /// wins.
    pub fn from_unsorted(symbol: impl Into<String>, timeframe: TimeFrame, mut bars: Vec<Bar>) -> Result<Self, BarError> {
        bars.sort_by_key(|b| b.timestamp);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self::new(symbol, timeframe, deduped)
    }

    pub fn empty(symbol: impl Into<String>, timeframe: TimeFrame) -> Self {
        Self { symbol: symbol.into(), timeframe, bars: Vec::new() }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandPoint {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Derived series, positionally aligned with the input bars. `None` marks
/// the warm-up region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum IndicatorOutput {
    Line(Vec<Option<f64>>),
    Bands(Vec<Option<BandPoint>>),
    Macd(Vec<Option<MacdPoint>>),
}

impl IndicatorOutput {
    pub fn len(&self) -> usize {
        match self {
            IndicatorOutput::Line(v) => v.len(),
            IndicatorOutput::Bands(v) => v.len(),
            IndicatorOutput::Macd(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of leading undefined entries.
    pub fn undefined_prefix(&self) -> usize {
        match self {
            IndicatorOutput::Line(v) => v.iter().take_while(|x| x.is_none()).count(),
            IndicatorOutput::Bands(v) => v.iter().take_while(|x| x.is_none()).count(),
            IndicatorOutput::Macd(v) => v.iter().take_while(|x| x.is_none()).count(),
        }
    }

    pub fn as_line(&self) -> Option<&[Option<f64>]> {
        match self {
            IndicatorOutput::Line(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bands(&self) -> Option<&[Option<BandPoint>]> {
        match self {
            IndicatorOutput::Bands(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_macd(&self) -> Option<&[Option<MacdPoint>]> {
        match self {
            IndicatorOutput::Macd(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub parameters: serde_json::Value,
    pub output: IndicatorOutput,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn flat_bar(day: u32, close: f64) -> Bar {
        Bar::new(ts(day), close, close, close, close, 100)
    }

    #[test]
    fn test_bar_validate_accepts_consistent_range() {
        let bar = Bar::new(ts(1), 10.0, 12.0, 9.0, 11.0, 5);
        assert!(bar.validate().is_ok());
        assert!(bar.is_sane());
    }

    #[test]
    fn test_bar_validate_rejects_high_below_close() {
        let bar = Bar::new(ts(1), 10.0, 10.5, 9.0, 11.0, 5);
        assert!(matches!(bar.validate(), Err(BarError::InconsistentRange { .. })));
    }

    #[test]
    fn test_bar_validate_rejects_negative_and_nan() {
        let negative = Bar::new(ts(1), -1.0, 1.0, -2.0, 0.5, 5);
        assert!(matches!(negative.validate(), Err(BarError::InvalidPrice { field: "open", .. })));

        let nan = Bar::new(ts(1), 1.0, f64::NAN, 1.0, 1.0, 5);
        assert!(matches!(nan.validate(), Err(BarError::InvalidPrice { field: "high", .. })));
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let result = BarSeries::new("TEST", TimeFrame::Day1, vec![flat_bar(1, 1.0), flat_bar(1, 2.0)]);
        match result {
            Err(BarError::OutOfOrder { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected OutOfOrder, got {:?}", other),
        }
    }

    #[test]
    fn test_series_reports_invalid_bar_index() {
        let bad = Bar::new(ts(2), 1.0, 0.5, 1.0, 1.0, 0);
        let result = BarSeries::new("TEST", TimeFrame::Day1, vec![flat_bar(1, 1.0), bad]);
        assert!(matches!(result, Err(BarError::InvalidBar { index: 1, .. })));
    }

    #[test]
    fn test_from_unsorted_sorts_and_keeps_last_duplicate() {
        let bars = vec![flat_bar(3, 3.0), flat_bar(1, 1.0), flat_bar(3, 30.0), flat_bar(2, 2.0)];
        let series = BarSeries::from_unsorted("TEST", TimeFrame::Day1, bars).unwrap();
        assert_eq!(series.closes(), vec![1.0, 2.0, 30.0]);
        assert_eq!(series.symbol(), "TEST");
        assert_eq!(series.last().map(|b| b.timestamp), Some(ts(3)));
    }

    #[test]
    fn test_empty_series_is_valid() {
        let series = BarSeries::new("TEST", TimeFrame::Hour1, Vec::new()).unwrap();
        assert!(series.is_empty());
        assert_eq!(series, BarSeries::empty("TEST", TimeFrame::Hour1));
    }

    #[test]
    fn test_timeframe_parsing_is_case_sensitive_for_month() {
        assert_eq!("1m".parse::<TimeFrame>().unwrap(), TimeFrame::Minute1);
        assert_eq!("1M".parse::<TimeFrame>().unwrap(), TimeFrame::Month1);
        assert!("2d".parse::<TimeFrame>().is_err());
        assert_eq!(TimeFrame::Hour4.to_string(), "4h");
    }

    #[test]
    fn test_timeframe_serde_uses_short_form() {
        for tf in [TimeFrame::Minute1, TimeFrame::Hour4, TimeFrame::Day1, TimeFrame::Month1] {
            let json = serde_json::to_string(&tf).unwrap();
            assert_eq!(json, format!("\"{}\"", tf.as_str()));
            assert_eq!(serde_json::from_str::<TimeFrame>(&json).unwrap(), tf);
        }
        assert_eq!(serde_json::from_str::<TimeFrame>("\"1d\"").unwrap(), TimeFrame::Day1);
        assert!(serde_json::from_str::<TimeFrame>("\"Day1\"").is_err());
    }

    #[test]
    fn test_periods_per_year() {
        assert_eq!(TimeFrame::Day1.periods_per_year(), 252.0);
        assert_eq!(TimeFrame::Hour1.periods_per_year(), 252.0 * 6.5);
        assert_eq!(TimeFrame::Minute1.periods_per_year(), 252.0 * 390.0);
    }

    #[test]
    fn test_indicator_output_serializes_tagged() {
        let output = IndicatorOutput::Line(vec![None, Some(2.0)]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "line", "values": [null, 2.0] }));
        assert_eq!(output.undefined_prefix(), 1);
        assert!(output.as_bands().is_none());
    }
}
