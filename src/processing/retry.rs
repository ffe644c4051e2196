//! Retry and timeout policy for backend calls.
//!
//! Every call to a summarization or analysis backend goes through [`RetryPolicy::call`]. Each
//! attempt is bounded by the configured timeout; retryable failures (unreachable provider, rate
//! limiting, timeouts) are retried with jittered exponential backoff. The default policy makes
//! no retries.

use crate::config::Config;
use crate::summarization::SummarizationClientError;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;

const MIN_BACKOFF: Duration = Duration::from_millis(100);

/// How backend calls are bounded and repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Time allowed for a single attempt.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            max_delay: Duration::from_secs(2),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Read the policy from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.backend_max_retries,
            max_delay: config.backend_retry_max_delay,
            call_timeout: config.backend_timeout,
        }
    }

    /// Run `operation` under this policy.
    pub async fn call<T, F, Fut>(&self, mut operation: F) -> Result<T, SummarizationClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SummarizationClientError>>,
    {
        let call_timeout = self.call_timeout;
        let attempt = || {
            let future = operation();
            async move {
                tokio::time::timeout(call_timeout, future)
                    .await
                    .unwrap_or_else(|_| {
                        Err(SummarizationClientError::Timeout(format!(
                            "no response within {call_timeout:?}"
                        )))
                    })
            }
        };

        attempt
            .retry(self.backoff())
            .when(SummarizationClientError::is_retryable)
            .notify(|error, delay| {
                tracing::warn!(error = %error, ?delay, "Backend call failed; retrying");
            })
            .await
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_jitter()
            .with_min_delay(MIN_BACKOFF.min(self.max_delay))
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }
}
