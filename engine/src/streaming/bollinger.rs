use super::window::RollingWindow;
use super::StreamingIndicator;
use crate::error::{EngineError, Result};
use crate::indicators::bollinger::band_point;
use shared::models::{BandPoint, Bar};

#[derive(Debug, Clone)]
pub struct StreamingBollinger {
    std_dev: f64,
    window: RollingWindow,
}

impl StreamingBollinger {
    pub fn new(period: usize, std_dev: f64) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("Bollinger period must be greater than 0".to_string()));
        }
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(EngineError::IndicatorError(format!(
                "Bollinger std_dev multiplier must be a non-negative number, got {}",
                std_dev
            )));
        }
        Ok(Self {
            std_dev,
            window: RollingWindow::new(period),
        })
    }
}

impl StreamingIndicator for StreamingBollinger {
    type Output = BandPoint;

    fn update(&mut self, bar: &Bar) -> Option<BandPoint> {
        self.window.push(bar.close);
        let middle = self.window.mean()?;
        let k = self.std_dev;
        Some(band_point(self.window.as_slice(), middle, k))
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn is_ready(&self) -> bool {
        self.window.is_full()
    }
}
