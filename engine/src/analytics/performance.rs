use serde::{Deserialize, Serialize};
use shared::models::{Bar, BarSeries};

/// Close-to-close simple returns; one fewer entry than `bars`.
///
/// A zero close yields a non-finite return for the following bar, which is
/// dropped rather than propagated.
pub fn simple_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|pair| pair[1].close / pair[0].close - 1.0)
        .filter(|r| r.is_finite())
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Annualised sample standard deviation of per-period returns, as a fraction.
pub fn volatility(returns: &[f64], periods_per_year: f64) -> Option<f64> {
    sample_std_dev(returns).map(|sd| sd * periods_per_year.sqrt())
}

/// Annualised Sharpe ratio of per-period returns against an annual
/// risk-free rate. `None` with fewer than two returns or zero volatility.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    let sd = sample_std_dev(returns)?;
    if sd == 0.0 {
        return None;
    }
    let excess = mean(returns) - risk_free_rate / periods_per_year;
    Some(excess / sd * periods_per_year.sqrt())
}

/// Fractional distance of each close below its running peak (always <= 0).
pub fn drawdown_curve(bars: &[Bar]) -> Vec<f64> {
    let mut peak = f64::MIN;
    bars.iter()
        .map(|bar| {
            peak = peak.max(bar.close);
            if peak > 0.0 {
                bar.close / peak - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Deepest drawdown as a non-positive fraction; 0 for empty input.
pub fn max_drawdown(bars: &[Bar]) -> f64 {
    drawdown_curve(bars).into_iter().fold(0.0, f64::min)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub symbol: String,
    pub bars: usize,
    pub total_return: Option<f64>,
    pub annualized_volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    pub fn from_series(series: &BarSeries, risk_free_rate: f64) -> Self {
        let bars = series.bars();
        let periods_per_year = series.timeframe().periods_per_year();
        let returns = simple_returns(bars);

        let total_return = match (bars.first(), bars.last()) {
            (Some(first), Some(last)) if bars.len() > 1 && first.close > 0.0 => Some(last.close / first.close - 1.0),
            _ => None,
        };

        Self {
            symbol: series.symbol().to_string(),
            bars: bars.len(),
            total_return,
            annualized_volatility: volatility(&returns, periods_per_year),
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate, periods_per_year),
            max_drawdown: max_drawdown(bars),
        }
    }
}
