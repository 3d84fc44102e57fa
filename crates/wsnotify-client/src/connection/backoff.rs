use std::time::Duration;

/// Exponential reconnect backoff: `min(base * 2^attempt, cap)`, for at most
/// `max_attempts` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before reconnect attempt number `attempt` (0-based), or `None`
    /// once the budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let delay = 2u32
            .checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(self.cap);
        Some(delay.min(self.cap))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), 5)
    }
}
