use std::collections::VecDeque;

/// Recompute the running sum from the window after this many updates so
/// rounding error cannot accumulate without bound.
pub(crate) const RESUM_INTERVAL: usize = 1_024;

/// Fixed-capacity trailing window with a running sum.
#[derive(Debug, Clone)]
pub(crate) struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
    sum: f64,
    // Non-zero entries currently held; lets an all-zero window report an
    // exact 0.0 sum whatever rounding the running sum picked up.
    non_zero: usize,
    updates_since_resum: usize,
}

impl RollingWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
            sum: 0.0,
            non_zero: 0,
            updates_since_resum: 0,
        }
    }

    pub(crate) fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        if value != 0.0 {
            self.non_zero += 1;
        }
        if self.values.len() > self.capacity {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                if old != 0.0 {
                    self.non_zero -= 1;
                }
            }
        }

        self.updates_since_resum += 1;
        if self.updates_since_resum >= RESUM_INTERVAL {
            self.sum = self.values.iter().sum();
            self.updates_since_resum = 0;
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity
    }

    pub(crate) fn sum(&self) -> f64 {
        if self.non_zero == 0 {
            0.0
        } else {
            self.sum
        }
    }

    pub(crate) fn mean(&self) -> Option<f64> {
        self.is_full().then(|| self.sum() / self.capacity as f64)
    }

    pub(crate) fn as_slice(&mut self) -> &[f64] {
        self.values.make_contiguous()
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
        self.non_zero = 0;
        self.updates_since_resum = 0;
    }
}
