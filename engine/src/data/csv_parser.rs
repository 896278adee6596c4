use crate::error::{EngineError, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use shared::models::{Bar, BarSeries, TimeFrame};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    /// `timestamp,open,high,low,close,volume`, comma-delimited.
    #[default]
    Standard,
    /// Semicolon-delimited broker export with `1.234,56` decimals.
    Brazilian,
}

impl FromStr for CsvFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(CsvFormat::Standard),
            "brazilian" => Ok(CsvFormat::Brazilian),
            other => Err(format!("Unknown CSV format '{}'. Use 'standard' or 'brazilian'.", other)),
        }
    }
}

impl fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvFormat::Standard => f.write_str("standard"),
            CsvFormat::Brazilian => f.write_str("brazilian"),
        }
    }
}

// Plain numbers, RFC 3339 / ISO dates or epoch milliseconds
pub mod standard_format {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    // Twelve digits of epoch milliseconds start in March 1973.
    const MIN_EPOCH_MILLIS_DIGITS: usize = 12;

    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc())
                .ok_or_else(|| anyhow!("Invalid date '{}'", s));
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            // "20240301" is a compact date, not 20 million milliseconds.
            if s.len() == 8 {
                return NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
                    .ok_or_else(|| anyhow!("Invalid compact date '{}'", s));
            }
            if s.len() < MIN_EPOCH_MILLIS_DIGITS {
                return Err(anyhow!("Integer timestamp '{}' is too short for epoch milliseconds", s));
            }
            let millis = s
                .parse::<i64>()
                .map_err(|e| anyhow!("Failed to parse epoch milliseconds '{}': {}", s, e))?;
            return DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| anyhow!("Epoch milliseconds out of range: {}", millis));
        }
        Err(anyhow!("Failed to parse timestamp '{}'", s))
    }

    pub fn parse_price(s: &str) -> Result<f64> {
        s.trim()
            .parse::<f64>()
            .map_err(|e| anyhow!("Failed to parse number '{}': {}", s, e))
    }

    // Accepts "1200" and "1200.0"; rejects fractions and negatives.
    pub fn parse_volume(s: &str) -> Result<u64> {
        let trimmed = s.trim();
        if let Ok(v) = trimmed.parse::<u64>() {
            return Ok(v);
        }
        let v = trimmed
            .parse::<f64>()
            .map_err(|e| anyhow!("Failed to parse volume '{}': {}", s, e))?;
        if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
            Ok(v as u64)
        } else {
            Err(anyhow!("Volume must be a non-negative whole number, got '{}'", s))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{TimeZone, Timelike};

        #[test]
        fn test_parse_timestamp_variants() {
            let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
            assert_eq!(parse_timestamp("2024-03-01").unwrap(), expected);
            assert_eq!(parse_timestamp("2024-03-01T00:00:00Z").unwrap(), expected);
            assert_eq!(parse_timestamp("2024-03-01 00:00:00").unwrap(), expected);
            assert_eq!(parse_timestamp(&expected.timestamp_millis().to_string()).unwrap(), expected);
            assert_eq!(parse_timestamp("2024-03-01T05:30:00+05:00").unwrap().hour(), 0);
        }

        #[test]
        fn test_parse_timestamp_invalid() {
            assert!(parse_timestamp("yesterday").is_err());
            assert!(parse_timestamp("2024-13-01").is_err());
        }

        #[test]
        fn test_compact_date_is_not_epoch_millis() {
            let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
            assert_eq!(parse_timestamp("20240301").unwrap(), expected);
            assert!(parse_timestamp("20241301").is_err());
            assert!(parse_timestamp("123456").is_err());
            assert!(parse_timestamp("1000000000").is_err());
            assert_eq!(
                parse_timestamp("100000000000").unwrap(),
                DateTime::from_timestamp_millis(100_000_000_000).unwrap()
            );
        }

        #[test]
        fn test_parse_volume() {
            assert_eq!(parse_volume("1200").unwrap(), 1200);
            assert_eq!(parse_volume("1200.0").unwrap(), 1200);
            assert!(parse_volume("12.5").is_err());
            assert!(parse_volume("-3").is_err());
        }
    }
}

// Brazilian number and date/time format handling
pub mod brazilian_format {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use std::str::FromStr;

    // Parses decimals like "1.234,56" or "123,45" into f64
    pub fn parse_decimal(s: &str) -> Result<f64> {
        let normalized = s.trim()
            .replace('.', "")  // Remove thousand separators
            .replace(',', "."); // Replace decimal separator

        f64::from_str(&normalized)
            .map_err(|e| anyhow!("Failed to parse decimal '{}': {}", s, e))
    }

    // Whole quantities like "24.228" (thousand separators only)
    pub fn parse_quantity(s: &str) -> Result<u64> {
        s.trim()
            .replace('.', "")
            .parse::<u64>()
            .map_err(|e| anyhow!("Failed to parse quantity '{}': {}", s, e))
    }

    // Parses date "dd/mm/yyyy" and time "HH:MM:SS" into DateTime<Utc>
    pub fn parse_datetime(date_str: &str, time_str: &str) -> Result<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(date_str.trim(), "%d/%m/%Y")
            .map_err(|e| anyhow!("Failed to parse date '{}': {}", date_str, e))?;
        let time = NaiveTime::parse_from_str(time_str.trim(), "%H:%M:%S")
            .map_err(|e| anyhow!("Failed to parse time '{}': {}", time_str, e))?;

        // Exchange-local times are taken as UTC.
        Ok(DateTime::from_naive_utc_and_offset(date.and_time(time), Utc))
    }

}

pub struct BarCsvParser;

impl BarCsvParser {
    /// Reads bars for `symbol` from a CSV file into a validated series.
    ///
    /// Rows may arrive in any order; duplicate timestamps keep the last row.
    pub fn load_series(
        file_path: impl AsRef<Path>,
        symbol: &str,
        timeframe: TimeFrame,
        format: CsvFormat,
    ) -> Result<BarSeries> {
        let file_path = file_path.as_ref();
        let file = File::open(file_path)?;
        let bars = Self::parse_bars(BufReader::new(file), format, Some(symbol))?;
        tracing::debug!(path = %file_path.display(), %symbol, %format, count = bars.len(), "Parsed bars from CSV");
        Ok(BarSeries::from_unsorted(symbol, timeframe, bars)?)
    }

    /// Parses every row into a `Bar`. For the Brazilian format, rows whose
    /// `Ativo` column names another symbol are skipped when `symbol` is set.
    pub fn parse_bars<R: Read>(reader: R, format: CsvFormat, symbol: Option<&str>) -> Result<Vec<Bar>> {
        let delimiter = match format {
            CsvFormat::Standard => b',',
            CsvFormat::Brazilian => b';',
        };
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut bars = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let line = idx + 2;
            let bar = match format {
                CsvFormat::Standard => Self::standard_row(&record, &headers, line)?,
                CsvFormat::Brazilian => {
                    let asset = Self::get_field(&record, &headers, "Ativo");
                    if let (Some(wanted), Some(asset)) = (symbol, asset) {
                        if !asset.is_empty() && !asset.eq_ignore_ascii_case(wanted) {
                            tracing::debug!(line, asset, wanted, "Skipping CSV row for another symbol");
                            continue;
                        }
                    }
                    Self::brazilian_row(&record, &headers, line)?
                }
            };

            bar.validate()
                .map_err(|e| EngineError::CsvDataFormatError(format!("Invalid bar at line {}: {}", line, e)))?;
            bars.push(bar);
        }
        Ok(bars)
    }

    // CSV Header: timestamp,open,high,low,close,volume
    fn standard_row(record: &StringRecord, headers: &StringRecord, line: usize) -> Result<Bar> {
        let timestamp_str = Self::get_field(record, headers, "timestamp")
            .or_else(|| Self::get_field(record, headers, "time"))
            .or_else(|| Self::get_field(record, headers, "date"));
        let timestamp_str = Self::required(timestamp_str, "timestamp", line)?;

        let timestamp = Self::parse_with(timestamp_str, "timestamp", line, standard_format::parse_timestamp)?;
        let open = Self::parse_with(Self::required_field(record, headers, "open", line)?, "open", line, standard_format::parse_price)?;
        let high = Self::parse_with(Self::required_field(record, headers, "high", line)?, "high", line, standard_format::parse_price)?;
        let low = Self::parse_with(Self::required_field(record, headers, "low", line)?, "low", line, standard_format::parse_price)?;
        let close = Self::parse_with(Self::required_field(record, headers, "close", line)?, "close", line, standard_format::parse_price)?;
        let volume = Self::parse_with(Self::required_field(record, headers, "volume", line)?, "volume", line, standard_format::parse_volume)?;

        Ok(Bar { timestamp, open, high, low, close, volume })
    }

    // CSV Header: Ativo;Data;Hora;Abertura;Máximo;Mínimo;Fechamento;Volume;Quantidade
    // Example Row: WINFUT;30/12/2024;18:20:00;124.080;124.090;123.938;123.983;600.822.115,84;24.228
    fn brazilian_row(record: &StringRecord, headers: &StringRecord, line: usize) -> Result<Bar> {
        let date_str = Self::required_field(record, headers, "Data", line)?;
        let time_str = Self::required_field(record, headers, "Hora", line)?;
        let open_str = Self::required_field(record, headers, "Abertura", line)?;
        let high_str = Self::required_field(record, headers, "Máximo", line)?;
        let low_str = Self::required_field(record, headers, "Mínimo", line)?;
        let close_str = Self::required_field(record, headers, "Fechamento", line)?;
        // "Volume" is the traded amount in currency; bar volume is the
        // traded quantity.
        let quantity_str = Self::required_field(record, headers, "Quantidade", line)?;

        let timestamp = brazilian_format::parse_datetime(date_str, time_str)
            .map_err(|e| EngineError::CsvDataFormatError(format!("Error parsing datetime at line {}: {}", line, e)))?;

        Ok(Bar {
            timestamp,
            open: Self::parse_with(open_str, "Abertura", line, brazilian_format::parse_decimal)?,
            high: Self::parse_with(high_str, "Máximo", line, brazilian_format::parse_decimal)?,
            low: Self::parse_with(low_str, "Mínimo", line, brazilian_format::parse_decimal)?,
            close: Self::parse_with(close_str, "Fechamento", line, brazilian_format::parse_decimal)?,
            volume: Self::parse_with(quantity_str, "Quantidade", line, brazilian_format::parse_quantity)?,
        })
    }

    fn parse_with<T>(raw: &str, name: &str, line: usize, parse: fn(&str) -> anyhow::Result<T>) -> Result<T> {
        parse(raw).map_err(|e| EngineError::CsvDataFormatError(format!("Error parsing '{}' at line {}: {}", name, line, e)))
    }

    fn required<'a>(value: Option<&'a str>, name: &str, line: usize) -> Result<&'a str> {
        value.ok_or_else(|| {
            EngineError::CsvDataFormatError(format!("Missing '{}' field in CSV record at line {}", name, line))
        })
    }

    fn required_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str, line: usize) -> Result<&'a str> {
        Self::required(Self::get_field(record, headers, name), name, line)
    }

    // Header lookup is case-insensitive so "Close" and "close" both match.
    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.trim().to_lowercase() == name.to_lowercase())
            .and_then(|pos| record.get(pos))
    }
}

/// Convenience for callers holding CSV text in memory.
pub fn parse_series_from_str(content: &str, symbol: &str, timeframe: TimeFrame, format: CsvFormat) -> Result<BarSeries> {
    let bars = BarCsvParser::parse_bars(content.as_bytes(), format, Some(symbol))?;
    Ok(BarSeries::from_unsorted(symbol, timeframe, bars)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_standard_csv() {
        let csv_content = "\
timestamp,open,high,low,close,volume
2024-01-03,11,12,10,11.5,300
2024-01-01,10,11,9,10.5,100
2024-01-02,10.5,11.5,10,11,200";
        let tmp_file = create_test_csv(csv_content);
        let series = BarCsvParser::load_series(tmp_file.path(), "AAPL", TimeFrame::Day1, CsvFormat::Standard).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.closes(), vec![10.5, 11.0, 11.5]);
        assert_eq!(series.bars()[0].volume, 100);
    }

    #[test]
    fn test_load_brazilian_csv() {
        let csv_content = "\
Ativo;Data;Hora;Abertura;Máximo;Mínimo;Fechamento;Volume;Quantidade
WINFUT;30/12/2024;18:20:00;124.080;124.090;123.938;123.983;600.822.115,84;24.228
PETR4;02/01/2023;10:00:00;23,50;23,80;23,40;23,75;1.000.000,00;1000
WINFUT;30/12/2024;18:25:00;123.983;124.100;123.900;124.050;500.000,00;20.000";
        let tmp_file = create_test_csv(csv_content);
        let series = BarCsvParser::load_series(tmp_file.path(), "WINFUT", TimeFrame::Minute5, CsvFormat::Brazilian).unwrap();

        // WINFUT prices are index points, so "124.080" is 124080.
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].open, 124080.0);
        assert_eq!(series.bars()[0].high, 124090.0);
        assert_eq!(series.bars()[0].low, 123938.0);
        assert_eq!(series.bars()[0].close, 123983.0);
        assert_eq!(series.bars()[0].volume, 24228);
        assert_eq!(series.bars()[1].timestamp, brazilian_format::parse_datetime("30/12/2024", "18:25:00").unwrap());
    }

    #[test]
    fn test_header_only_file() {
        let tmp_file = create_test_csv("timestamp,open,high,low,close,volume");
        let series = BarCsvParser::load_series(tmp_file.path(), "X", TimeFrame::Day1, CsvFormat::Standard).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_missing_field() {
        let csv_content = "\
Ativo;Data;Hora;Abertura;Máximo;Mínimo;Fechamento;Volume
WINFUT;30/12/2024;18:20:00;124.080;124.090;123.938;123.983;600.822.115,84"; // Missing Quantidade
        let tmp_file = create_test_csv(csv_content);
        let err = BarCsvParser::load_series(tmp_file.path(), "WINFUT", TimeFrame::Day1, CsvFormat::Brazilian).unwrap_err();
        assert!(matches!(err, EngineError::CsvDataFormatError(_)));
        assert!(err.to_string().contains("Missing 'Quantidade' field"));
    }

    #[test]
    fn test_invalid_value() {
        let csv_content = "\
timestamp,open,high,low,close,volume
2024-01-01,abc,11,9,10.5,100";
        let err = BarCsvParser::parse_bars(csv_content.as_bytes(), CsvFormat::Standard, None).unwrap_err();
        assert!(err.to_string().contains("Error parsing 'open' at line 2"));
        assert!(err.to_string().contains("Failed to parse number 'abc'"));
    }

    #[test]
    fn test_short_row_is_csv_system_error() {
        let csv_content = "timestamp,open,high,low,close,volume\n2024-01-01,10,11";
        let err = BarCsvParser::parse_bars(csv_content.as_bytes(), CsvFormat::Standard, None).unwrap_err();
        assert!(matches!(err, EngineError::CsvSystemError { .. }));
    }

    #[test]
    fn test_inconsistent_bar_rejected() {
        let csv_content = "timestamp,open,high,low,close,volume\n2024-01-01,10,9,8,10.5,100";
        let err = BarCsvParser::parse_bars(csv_content.as_bytes(), CsvFormat::Standard, None).unwrap_err();
        assert!(err.to_string().contains("Invalid bar at line 2"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BarCsvParser::load_series("non_existent_file.csv", "X", TimeFrame::Day1, CsvFormat::Standard).unwrap_err();
        assert!(matches!(err, EngineError::IoError { .. }));
    }

    #[test]
    fn test_parse_series_from_str_dedups() {
        let csv_content = "\
Date,Open,High,Low,Close,Volume
2024-01-01,10,11,9,10,1
2024-01-01,10,11,9,11,2";
        let series = parse_series_from_str(csv_content, "X", TimeFrame::Day1, CsvFormat::Standard).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].close, 11.0);
    }

    #[test]
    fn test_csv_format_parsing() {
        assert_eq!("Brazilian".parse::<CsvFormat>().unwrap(), CsvFormat::Brazilian);
        assert!("tsv".parse::<CsvFormat>().is_err());
    }
}
