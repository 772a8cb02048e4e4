//! Retry support for provider HTTP calls.
//!
//! Backoff-based executor with a small options facade. Call sites wrap
//! requests in [`maybe_retry`] so retry stays an opt-in, per-client knob.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;

use crate::error::LlmError;

/// Backoff crate-based retry executor
#[derive(Debug, Clone)]
pub struct BackoffRetryExecutor {
    backoff: ExponentialBackoff,
}

impl Default for BackoffRetryExecutor {
    fn default() -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(1000))
            .with_max_interval(Duration::from_secs(60))
            .with_multiplier(1.5)
            .with_max_elapsed_time(Some(Duration::from_secs(300)))
            .build();
        Self { backoff }
    }
}

impl BackoffRetryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an executor from an explicit backoff configuration
    pub fn with_backoff(backoff: ExponentialBackoff) -> Self {
        Self { backoff }
    }

    /// Execute an operation, retrying transient failures
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, LlmError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: std::future::Future<Output = Result<T, LlmError>> + Send,
        T: Send,
    {
        backoff::future::retry(self.backoff.clone(), || async {
            operation().await.map_err(|e| {
                if e.is_retryable() {
                    tracing::debug!("retrying after transient error: {e}");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }
}

/// Unified retry options
#[derive(Debug, Clone, Default)]
pub struct RetryOptions {
    /// Optional executor override; `None` uses the default backoff schedule
    pub backoff_executor: Option<BackoffRetryExecutor>,
}

impl RetryOptions {
    /// Use the default backoff schedule
    pub fn backoff() -> Self {
        Self::default()
    }

    /// Use a custom backoff executor
    pub fn with_backoff_executor(mut self, executor: BackoffRetryExecutor) -> Self {
        self.backoff_executor = Some(executor);
        self
    }
}

/// Retry only when options are provided.
///
/// Keeps call sites consistent when retry is optional per client.
pub async fn maybe_retry<F, Fut, T>(
    options: Option<RetryOptions>,
    operation: F,
) -> Result<T, LlmError>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, LlmError>> + Send,
    T: Send,
{
    if let Some(opts) = options {
        let executor = opts.backoff_executor.unwrap_or_default();
        executor.execute(operation).await
    } else {
        operation().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn fast_executor() -> BackoffRetryExecutor {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(1))
            .with_max_interval(Duration::from_millis(5))
            .with_max_elapsed_time(Some(Duration::from_millis(200)))
            .build();
        BackoffRetryExecutor::with_backoff(backoff)
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_for_call = attempts.clone();
        let res: Result<(), LlmError> = fast_executor()
            .execute(|| {
                let attempts = attempts_for_call.clone();
                async move {
                    let prev = attempts.fetch_add(1, Ordering::Relaxed);
                    if prev < 1 {
                        Err(LlmError::api_error(500, "server"))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(res.is_ok());
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_for_call = attempts.clone();
        let res: Result<(), LlmError> = fast_executor()
            .execute(|| {
                let attempts = attempts_for_call.clone();
                async move {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    Err(LlmError::InvalidInput("bad".into()))
                }
            })
            .await;
        assert!(matches!(res, Err(LlmError::InvalidInput(_))));
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn maybe_retry_without_options_runs_once() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_for_call = attempts.clone();
        let res: Result<(), LlmError> = maybe_retry(None, || {
            let attempts = attempts_for_call.clone();
            async move {
                attempts.fetch_add(1, Ordering::Relaxed);
                Err(LlmError::api_error(500, "server"))
            }
        })
        .await;
        assert!(res.is_err());
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }
}
