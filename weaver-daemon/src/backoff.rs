use std::time::Duration;

/// Doubling debounce wait with a ceiling.
///
/// Each passive timer firing doubles the wait used for the next arm; an
/// on-demand fetch resets it to the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Wait to use for the next arm.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Double the wait, capped at the ceiling. Returns the new wait.
    pub fn advance(&mut self) -> Duration {
        self.current = self.current.saturating_mul(2).min(self.max);
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}
