use crate::domain::errors::{CallTimeout, FailureKind, classify};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Timeout and retry bounds for one collaborator call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after the first, transient failures only
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every further one
    pub base_backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    /// Same timeout, single attempt. Used for order placement, where a
    /// repeated request could open a duplicate position.
    pub fn single_attempt(&self) -> Self {
        Self {
            max_retries: 0,
            ..*self
        }
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// A collaborator call that failed for good.
#[derive(Debug)]
pub struct CallFailure {
    pub error: anyhow::Error,
    pub kind: FailureKind,
    pub attempts: u32,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts > 1 {
            write!(f, "{:#} (after {} attempts)", self.error, self.attempts)
        } else {
            write!(f, "{:#}", self.error)
        }
    }
}

/// Run `op` under `policy`: each attempt is bounded by the timeout and
/// transient failures are retried with exponential backoff.
pub async fn guarded<T, F, Fut>(policy: &CallPolicy, label: &str, mut op: F) -> Result<T, CallFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::Error::new(CallTimeout {
                label: label.to_string(),
                duration_ms: policy.timeout.as_millis() as u64,
            })),
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let kind = classify(&error);
        if kind.is_transient() && attempts <= policy.max_retries {
            let delay = policy.backoff(attempts);
            warn!(
                "{}: attempt {} failed ({:#}), retrying in {:?}",
                label, attempts, error, delay
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        return Err(CallFailure {
            error,
            kind,
            attempts,
        });
    }
}
