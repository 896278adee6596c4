// engine/src/services/indicator_service/mod.rs
// IndicatorService struct and its public methods; each operation's body
// lives in a sibling handler module.
use super::{IndicatorRequest, IndicatorResponse, IndicatorSpec, LoadCsvRequest, LoadCsvResponse};
use crate::analytics::PerformanceSummary;
use crate::config::EngineSettings;
use crate::data::market_data::MarketDataStore;
use crate::error::Result;
use shared::models::{Indicator, TimeFrame};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod calculate_indicator;
pub mod calculate_indicators;
pub mod helpers;
pub mod load_csv_data;
pub mod performance_summary;

pub struct IndicatorService {
    market_data_store: Arc<RwLock<MarketDataStore>>,
    settings: Arc<EngineSettings>,
}

impl IndicatorService {
    pub fn new(market_data_store: Arc<RwLock<MarketDataStore>>, settings: EngineSettings) -> Self {
        IndicatorService { market_data_store, settings: Arc::new(settings) }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn market_data_store(&self) -> Arc<RwLock<MarketDataStore>> {
        Arc::clone(&self.market_data_store)
    }

    pub async fn load_csv_data(&self, request: LoadCsvRequest) -> Result<LoadCsvResponse> {
        tracing::info!(
            symbol = %request.symbol,
            path = %request.file_path,
            timeframe = %request.timeframe,
            "Received LoadCsvRequest, dispatching to handler."
        );
        load_csv_data::handle_load_csv_data(request, self.market_data_store.clone(), &self.settings).await
    }

    pub async fn calculate_indicator(&self, request: IndicatorRequest) -> Result<IndicatorResponse> {
        tracing::info!(
            symbol = %request.symbol,
            indicator_type = %request.indicator_type,
            parameters = %request.parameters,
            "Received IndicatorRequest, dispatching to handler."
        );
        calculate_indicator::handle_calculate_indicator(request, self.market_data_store.clone(), &self.settings).await
    }

    /// Computes every spec over one snapshot of the series. An empty `specs`
    /// computes the configured default set. Results keep request order.
    pub async fn calculate_indicators(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        specs: Vec<IndicatorSpec>,
    ) -> Result<Vec<Indicator>> {
        tracing::info!(%symbol, %timeframe, requested = specs.len(), "Received batch indicator request, dispatching to handler.");
        calculate_indicators::handle_calculate_indicators(
            symbol,
            timeframe,
            specs,
            self.market_data_store.clone(),
            &self.settings,
        )
        .await
    }

    pub async fn performance_summary(&self, symbol: &str, timeframe: TimeFrame) -> Result<PerformanceSummary> {
        tracing::info!(%symbol, %timeframe, "Received PerformanceSummary request, dispatching to handler.");
        performance_summary::handle_performance_summary(
            symbol,
            timeframe,
            self.market_data_store.clone(),
            &self.settings,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::indicators::test_support::bars_from_closes;
    use serde_json::json;
    use shared::models::IndicatorOutput;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_service() -> IndicatorService {
        let market_data_store = Arc::new(RwLock::new(MarketDataStore::new()));
        IndicatorService::new(market_data_store, EngineSettings::default())
    }

    async fn create_test_service_with_closes(symbol: &str, closes: &[f64]) -> IndicatorService {
        let service = create_test_service();
        let mut store = service.market_data_store.write().await;
        store.add_bars(symbol, TimeFrame::Day1, bars_from_closes(closes)).unwrap();
        drop(store);
        service
    }

    fn create_dummy_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    fn load_request(file: &NamedTempFile, symbol: &str) -> LoadCsvRequest {
        LoadCsvRequest {
            file_path: file.path().to_str().unwrap().to_string(),
            symbol: symbol.to_string(),
            timeframe: TimeFrame::Day1,
            format: None,
        }
    }

    fn wave(len: usize) -> Vec<f64> {
        (0..len).map(|i| 100.0 + (i as f64 / 5.0).sin() * 6.0 + i as f64 * 0.05).collect()
    }

    #[tokio::test]
    async fn test_load_csv_data_success() {
        let service = create_test_service();
        let csv_content = "timestamp,open,high,low,close,volume\n2024-01-01,10,11,9,10.5,100\n2024-01-02,10.5,12,10,11.5,200";
        let tmp_file = create_dummy_csv(csv_content);

        let response = service.load_csv_data(load_request(&tmp_file, "AAPL")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.bars_loaded, 2);
        assert!(response.message.contains("Loaded 2 bars"));

        let store = service.market_data_store.read().await;
        let series = store.get_series("AAPL", TimeFrame::Day1).unwrap();
        assert_eq!(series.closes(), vec![10.5, 11.5]);
    }

    #[tokio::test]
    async fn test_load_csv_data_brazilian_override() {
        let service = create_test_service();
        let csv_content = "Ativo;Data;Hora;Abertura;Máximo;Mínimo;Fechamento;Volume;Quantidade\nWINFUT;30/12/2024;18:20:00;124.080;124.090;123.938;123.983;600.822.115,84;24.228";
        let tmp_file = create_dummy_csv(csv_content);
        let mut request = load_request(&tmp_file, "WINFUT");
        request.format = Some(crate::data::csv_parser::CsvFormat::Brazilian);

        let response = service.load_csv_data(request).await.unwrap();
        assert_eq!(response.bars_loaded, 1);
    }

    #[tokio::test]
    async fn test_load_csv_data_file_not_found() {
        let service = create_test_service();
        let request = LoadCsvRequest {
            file_path: "non_existent_file.csv".to_string(),
            symbol: "TEST".to_string(),
            timeframe: TimeFrame::Day1,
            format: None,
        };
        let err = service.load_csv_data(request).await.unwrap_err();
        assert!(matches!(err, EngineError::IoError { .. }));
        assert!(err.to_string().contains("I/O error"));
    }

    #[tokio::test]
    async fn test_load_csv_data_bad_value() {
        let service = create_test_service();
        let tmp_file = create_dummy_csv("timestamp,open,high,low,close,volume\n2024-01-01,NOT_A_NUMBER,11,9,10.5,100");
        let err = service.load_csv_data(load_request(&tmp_file, "X")).await.unwrap_err();
        assert!(err.to_string().contains("CSV data format error"));
        assert!(err.to_string().contains("Error parsing 'open'"));
        assert!(service.market_data_store.read().await.get_series("X", TimeFrame::Day1).is_none());
    }

    #[tokio::test]
    async fn test_calculate_indicator_sma() {
        let service = create_test_service_with_closes("TEST", &[1.0, 2.0, 3.0, 4.0, 5.0]).await;
        let request = IndicatorRequest {
            symbol: "TEST".to_string(),
            timeframe: TimeFrame::Day1,
            indicator_type: "SMA".to_string(),
            parameters: json!({ "period": 3 }),
        };
        let response = service.calculate_indicator(request).await.unwrap();
        assert_eq!(response.indicator.name, "SMA(3)");
        assert_eq!(
            response.indicator.output,
            IndicatorOutput::Line(vec![None, None, Some(2.0), Some(3.0), Some(4.0)])
        );
    }

    #[tokio::test]
    async fn test_calculate_indicator_unknown_symbol() {
        let service = create_test_service();
        let request = IndicatorRequest {
            symbol: "NODATA".to_string(),
            timeframe: TimeFrame::Day1,
            indicator_type: "rsi".to_string(),
            parameters: serde_json::Value::Null,
        };
        let err = service.calculate_indicator(request).await.unwrap_err();
        assert!(err.is_not_found(), "{}", err);
    }

    #[tokio::test]
    async fn test_calculate_indicator_bad_type_and_params() {
        let service = create_test_service_with_closes("TEST", &wave(30)).await;
        let unknown = IndicatorRequest {
            symbol: "TEST".to_string(),
            timeframe: TimeFrame::Day1,
            indicator_type: "vwap".to_string(),
            parameters: serde_json::Value::Null,
        };
        let err = service.calculate_indicator(unknown).await.unwrap_err();
        assert!(err.to_string().contains("Unknown indicator type: vwap"));

        let zero_period = IndicatorRequest {
            symbol: "TEST".to_string(),
            timeframe: TimeFrame::Day1,
            indicator_type: "ema".to_string(),
            parameters: json!({ "period": 0 }),
        };
        let err = service.calculate_indicator(zero_period).await.unwrap_err();
        assert!(matches!(err, EngineError::IndicatorError(_)));
    }

    #[tokio::test]
    async fn test_calculate_indicators_keeps_request_order() {
        let service = create_test_service_with_closes("TEST", &wave(60)).await;
        let specs = vec![
            IndicatorSpec::new("macd", serde_json::Value::Null),
            IndicatorSpec::new("sma", json!({ "period": 5 })),
            IndicatorSpec::new("bollinger", json!({ "period": 10, "std_dev": 2.0 })),
            IndicatorSpec::new("rsi", serde_json::Value::Null),
            IndicatorSpec::new("ema", json!({ "period": 8 })),
        ];
        let results = service.calculate_indicators("TEST", TimeFrame::Day1, specs).await.unwrap();
        let names: Vec<&str> = results.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["MACD(12,26,9)", "SMA(5)", "BB(10,2)", "RSI(14)", "EMA(8)"]);
        assert!(results.iter().all(|i| i.output.len() == 60));
    }

    #[tokio::test]
    async fn test_calculate_indicators_matches_single_requests() {
        let service = create_test_service_with_closes("TEST", &wave(40)).await;
        let batch = service
            .calculate_indicators("TEST", TimeFrame::Day1, vec![IndicatorSpec::new("rsi", json!({ "period": 7 }))])
            .await
            .unwrap();
        let single = service
            .calculate_indicator(IndicatorRequest {
                symbol: "TEST".to_string(),
                timeframe: TimeFrame::Day1,
                indicator_type: "rsi".to_string(),
                parameters: json!({ "period": 7 }),
            })
            .await
            .unwrap();
        assert_eq!(batch[0], single.indicator);
    }

    #[tokio::test]
    async fn test_calculate_indicators_defaults_when_empty() {
        let service = create_test_service_with_closes("TEST", &wave(80)).await;
        let results = service.calculate_indicators("TEST", TimeFrame::Day1, Vec::new()).await.unwrap();
        // sma 20/50, ema 12/26, rsi, bollinger, macd
        assert_eq!(results.len(), 7);
    }

    #[tokio::test]
    async fn test_calculate_indicators_fails_fast_on_bad_spec() {
        let service = create_test_service_with_closes("TEST", &wave(30)).await;
        let specs = vec![
            IndicatorSpec::new("sma", json!({ "period": 5 })),
            IndicatorSpec::new("macd", json!({ "fast": 40 })),
        ];
        let err = service.calculate_indicators("TEST", TimeFrame::Day1, specs).await.unwrap_err();
        assert!(matches!(err, EngineError::IndicatorError(_)));
    }

    #[tokio::test]
    async fn test_calculate_indicators_with_single_permit() {
        let mut settings = EngineSettings::default();
        settings.max_parallel_indicators = 1;
        let store = Arc::new(RwLock::new(MarketDataStore::new()));
        store.write().await.add_bars("TEST", TimeFrame::Day1, bars_from_closes(&wave(50))).unwrap();
        let service = IndicatorService::new(store, settings);

        let specs: Vec<IndicatorSpec> =
            (2..12).map(|p| IndicatorSpec::new("sma", json!({ "period": p }))).collect();
        let results = service.calculate_indicators("TEST", TimeFrame::Day1, specs).await.unwrap();
        for (p, indicator) in (2..12).zip(results.iter()) {
            assert_eq!(indicator.name, format!("SMA({})", p));
        }
    }

    #[tokio::test]
    async fn test_performance_summary() {
        let service = create_test_service_with_closes("TEST", &[100.0, 110.0, 99.0, 120.0]).await;
        let summary = service.performance_summary("TEST", TimeFrame::Day1).await.unwrap();
        assert_eq!(summary.bars, 4);
        assert!((summary.total_return.unwrap() - 0.2).abs() < 1e-12);
        assert!((summary.max_drawdown + 0.1).abs() < 1e-12);

        let err = service.performance_summary("TEST", TimeFrame::Hour1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_header_only_csv_yields_empty_outputs() {
        let service = create_test_service();
        let tmp_file = create_dummy_csv("timestamp,open,high,low,close,volume");
        let response = service.load_csv_data(load_request(&tmp_file, "X")).await.unwrap();
        assert!(response.success);
        assert_eq!(response.bars_loaded, 0);

        let results = service.calculate_indicators("X", TimeFrame::Day1, Vec::new()).await.unwrap();
        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|i| i.output.is_empty()));

        let single = service
            .calculate_indicator(IndicatorRequest {
                symbol: "X".to_string(),
                timeframe: TimeFrame::Day1,
                indicator_type: "rsi".to_string(),
                parameters: serde_json::Value::Null,
            })
            .await
            .unwrap();
        assert!(single.indicator.output.is_empty());

        let summary = service.performance_summary("X", TimeFrame::Day1).await.unwrap();
        assert_eq!(summary.bars, 0);
        assert_eq!(summary.total_return, None);
        assert_eq!(summary.max_drawdown, 0.0);
    }
}
