use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Linear,
}

/// Retry settings for calls into the hosted backend.
///
/// Held by the caller and passed explicitly; no attempt counters live outside a single `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1500),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    ///
    /// `None` once the attempt budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts.max(1) {
            return None;
        }

        Some(match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt),
        })
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget runs out.
    pub async fn run<T, E, F, P>(&self, mut operation: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if retryable(&err) => match self.delay_for(attempt) {
                    Some(delay) => {
                        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying backend call");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }
}
