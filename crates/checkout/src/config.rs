use std::time::Duration;

/// Retry policy for the checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Total attempts per checkout, including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Pause before a retry.
    pub retry_backoff: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_backoff: Duration::from_millis(25),
        }
    }
}

impl CheckoutConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }
}
