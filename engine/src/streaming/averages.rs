use super::window::RollingWindow;
use super::StreamingIndicator;
use crate::error::{EngineError, Result};
use crate::indicators::ema::{ema_multiplier, EmaWarmup};
use shared::models::Bar;

#[derive(Debug, Clone)]
pub struct StreamingSma {
    period: usize,
    window: RollingWindow,
}

impl StreamingSma {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("SMA period must be greater than 0".to_string()));
        }
        Ok(Self {
            period,
            window: RollingWindow::new(period),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl StreamingIndicator for StreamingSma {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.window.push(bar.close);
        self.window.mean()
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn is_ready(&self) -> bool {
        self.window.is_full()
    }
}

/// Carries only the previous EMA value between bars.
#[derive(Debug, Clone)]
pub struct StreamingEma {
    period: usize,
    warmup: EmaWarmup,
    multiplier: f64,
    previous: Option<f64>,
    seen: usize,
}

impl StreamingEma {
    pub fn new(period: usize, warmup: EmaWarmup) -> Result<Self> {
        if period == 0 {
            return Err(EngineError::IndicatorError("EMA period must be greater than 0".to_string()));
        }
        Ok(Self {
            period,
            warmup,
            multiplier: ema_multiplier(period),
            previous: None,
            seen: 0,
        })
    }

    /// Last computed EMA, even while its output is still withheld.
    pub fn value(&self) -> Option<f64> {
        self.previous
    }

    fn hidden(&self) -> usize {
        match self.warmup {
            EmaWarmup::Seeded => 0,
            EmaWarmup::Withheld => self.period - 1,
        }
    }
}

impl StreamingIndicator for StreamingEma {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let ema = match self.previous {
            None => bar.close,
            Some(prev) => (bar.close - prev) * self.multiplier + prev,
        };
        self.previous = Some(ema);
        self.seen += 1;
        self.is_ready().then_some(ema)
    }

    fn reset(&mut self) {
        self.previous = None;
        self.seen = 0;
    }

    fn is_ready(&self) -> bool {
        self.seen > self.hidden()
    }
}
