use super::window::RollingWindow;
use super::StreamingIndicator;
use crate::error::{EngineError, Result};
use crate::indicators::rsi::{gain_loss, rsi_from_averages};
use shared::models::Bar;

/// RSI over simple trailing averages, kept as running gain/loss sums.
#[derive(Debug, Clone)]
pub struct StreamingRsi {
    period: usize,
    previous_close: Option<f64>,
    gains: RollingWindow,
    losses: RollingWindow,
}

impl StreamingRsi {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("RSI period must be greater than 0".to_string()));
        }
        Ok(Self {
            period,
            previous_close: None,
            gains: RollingWindow::new(period),
            losses: RollingWindow::new(period),
        })
    }
}

impl StreamingIndicator for StreamingRsi {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let previous = self.previous_close.replace(bar.close)?;
        let (gain, loss) = gain_loss(bar.close - previous);
        self.gains.push(gain);
        self.losses.push(loss);

        if !self.is_ready() {
            return None;
        }
        let period = self.period as f64;
        Some(rsi_from_averages(self.gains.sum() / period, self.losses.sum() / period))
    }

    fn reset(&mut self) {
        self.previous_close = None;
        self.gains.clear();
        self.losses.clear();
    }

    fn is_ready(&self) -> bool {
        self.gains.is_full()
    }
}
