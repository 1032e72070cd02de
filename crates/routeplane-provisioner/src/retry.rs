//! Retry policies and async retry helper.

use routeplane_kernel::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Same delay every attempt.
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^attempt`, capped at `max_ms`.
    ExponentialBackoff { base_ms: u64, max_ms: u64 },
}

impl RetryPolicy {
    /// Returns the sleep duration before the given retry attempt (0-indexed).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let ms = match self {
            RetryPolicy::Fixed { delay_ms } => *delay_ms,
            RetryPolicy::ExponentialBackoff { base_ms, max_ms } => {
                let exp = u32::try_from(attempt)
                    .ok()
                    .and_then(|a| 1u64.checked_shl(a))
                    .and_then(|s| base_ms.checked_mul(s))
                    .unwrap_or(*max_ms);
                exp.min(*max_ms)
            }
        };
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::ExponentialBackoff {
            base_ms: 200,
            max_ms: 2_000,
        }
    }
}

/// How many attempts to make and which [`RetryPolicy`] to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts (1 = no retry).
    pub max_attempts: usize,
    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::exponential(3, 200, 2_000)
    }
}

impl RetryConfig {
    /// `retries` retries after the first attempt, exponential backoff.
    pub fn exponential(retries: usize, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            policy: RetryPolicy::ExponentialBackoff { base_ms, max_ms },
        }
    }

    /// A single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            policy: RetryPolicy::Fixed { delay_ms: 0 },
        }
    }
}

/// Retry `f` up to `config.max_attempts` times while `is_retryable` holds.
///
/// `operation` only labels the warning logged before each retry.
pub async fn retry_with_policy<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    is_retryable: impl Fn(&ProvisionError) -> bool,
    mut f: F,
) -> ProvisionResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProvisionResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 0..max_attempts {
        if attempt > 0 {
            let delay = config.policy.delay_for(attempt - 1);
            if let Some(err) = &last_err {
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retrying after transient failure"
                );
            }
            tokio::time::sleep(delay).await;
        }
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                last_err = Some(e);
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| ProvisionError::GatewayTransient("no attempts made".to_string())))
}
