//! Exponential-backoff retry for transiently failing browser operations.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::ScraperConfig;
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            // A policy that never runs its operation is a configuration bug.
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
            config.retry_backoff_factor,
        )
    }

    /// Backoff before retry number `attempt + 1`, without jitter:
    /// `base_delay * backoff_factor^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.mul_f64(self.backoff_factor.powi(attempt as i32))
    }
}

/// Scale a delay by a uniform 0.9–1.1 factor so simultaneous retries
/// against the portal don't land in lockstep.
fn jittered(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.9..=1.1);
    delay.mul_f64(factor)
}

/// Run `op`, retrying transient failures with jittered exponential backoff.
///
/// Only errors classified transient by `ScrapeError::is_transient` are
/// retried; anything else, and the final failed attempt, is returned
/// unchanged. Each failed attempt is logged.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = jittered(policy.delay_for(attempt));
                attempt += 1;
                warn!(
                    "attempt {}/{} of {} failed, retrying in {:?}: {}",
                    attempt, policy.max_attempts, what, delay, error
                );
                tokio::time::sleep(delay).await;
            }
            Err(error) => {
                if attempt > 0 {
                    warn!(
                        "{} failed after {} attempts: {}",
                        what,
                        attempt + 1,
                        error
                    );
                }
                return Err(error);
            }
        }
    }
}
