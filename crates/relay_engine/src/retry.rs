use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use relay_logging::relay_warn;

pub const DEFAULT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls allowed, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Fixed pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Sleeping seam so retry delays and cooldowns can be observed in tests.
#[async_trait::async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait::async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Call `operation` until it succeeds, fails with an error `is_retryable` rejects,
/// or `policy.max_attempts` calls were made. The attempt number (from 1) is passed in.
pub async fn retry<T, E, Op, Fut, P>(
    label: &str,
    policy: RetryPolicy,
    pause: &dyn Pause,
    mut operation: Op,
    is_retryable: P,
) -> RetryOutcome<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(err) => {
                if !is_retryable(&err) || attempt >= max_attempts {
                    return RetryOutcome {
                        result: Err(err),
                        attempts: attempt,
                    };
                }
                relay_warn!(
                    "stage=retry op={} attempt={}/{} delay_ms={} error={}",
                    label,
                    attempt,
                    max_attempts,
                    policy.delay.as_millis(),
                    err
                );
                pause.pause(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
