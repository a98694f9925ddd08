//! Retry with exponential backoff for event handlers that talk to the outside world.
use std::{fmt::Display, future::Future, time::Duration};

use log::*;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on the random jitter added to each delay.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), initial_delay, max_delay, jitter: Duration::ZERO }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// The delay before attempt number `attempt + 1`, without jitter. Doubles each time, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter.is_zero() {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        delay + Duration::from_millis(extra)
    }

    /// Calls `op` until it succeeds or the attempts run out, sleeping between attempts. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => {
                    if attempt > 1 {
                        debug!("📬️ {label} succeeded on attempt {attempt}");
                    }
                    return Ok(v);
                },
                Err(e) if attempt >= self.max_attempts => {
                    warn!("📬️ {label} failed after {attempt} attempt(s). Giving up. {e}");
                    return Err(e);
                },
                Err(e) => {
                    let delay = self.jittered(self.delay_for(attempt));
                    info!("📬️ {label} failed on attempt {attempt}. Retrying in {}ms. {e}", delay.as_millis());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            }
        }
    }
}
