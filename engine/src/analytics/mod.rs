// Performance and risk metrics shown next to backtests and portfolios
pub mod performance;

pub use performance::{
    drawdown_curve, max_drawdown, sharpe_ratio, simple_returns, volatility, PerformanceSummary,
};
