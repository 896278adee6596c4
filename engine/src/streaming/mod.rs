// Incremental indicators for live-updating charts.
//
// Each type consumes one bar at a time and yields the value the batch
// function in `crate::indicators` would produce at the same index.
pub mod averages;
pub mod bollinger;
pub mod rsi;
mod window;

pub use averages::{StreamingEma, StreamingSma};
pub use bollinger::StreamingBollinger;
pub use rsi::StreamingRsi;

use shared::models::Bar;

pub trait StreamingIndicator {
    type Output;

    /// Feeds the next bar. Returns `None` while warming up.
    fn update(&mut self, bar: &Bar) -> Option<Self::Output>;

    /// Forgets all history, as if freshly constructed.
    fn reset(&mut self);

    fn is_ready(&self) -> bool;

    fn replay(&mut self, bars: &[Bar]) -> Vec<Option<Self::Output>> {
        bars.iter().map(|bar| self.update(bar)).collect()
    }
}
