//! Retry decisions with exponential backoff.
//!
//! One [`RetryPolicy`] serves two callers: [`RetryingTransport`] retries
//! transient HTTP failures, and the reconciler's apply loop uses the same
//! policy to pace restarts after a conflict.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::request::{Request, Response};
use crate::{BoxFuture, Transport};

/// Decides whether, and after how long, to try again.
pub trait RetryPolicy: Send + Sync {
    /// Delay before the next try after `failures` consecutive failures
    /// (1 after the first failure), or `None` to give up.
    fn next_delay(&self, failures: u32) -> Option<Duration>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    /// Total tries, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            ..Default::default()
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay for a 0-indexed retry.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

impl RetryPolicy for Backoff {
    fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures == 0 || failures >= self.max_attempts {
            return None;
        }
        Some(self.delay_for_attempt(failures - 1))
    }
}

/// Wraps a transport and retries transient failures under a policy.
///
/// Conflicts and client errors are returned immediately; conflict handling
/// belongs to the apply loop.
pub struct RetryingTransport<T> {
    inner: T,
    policy: Arc<dyn RetryPolicy>,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: Arc<dyn RetryPolicy>) -> Self {
        Self { inner, policy }
    }
}

impl<T: Transport> Transport for RetryingTransport<T> {
    fn send<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move {
            let mut failures = 0;
            loop {
                match self.inner.send(request).await {
                    Err(e) if e.is_transient() => {
                        failures += 1;
                        let Some(delay) = self.policy.next_delay(failures) else {
                            return Err(e);
                        };
                        tracing::warn!(
                            request = %request,
                            attempt = failures,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "transient failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    other => return other,
                }
            }
        })
    }
}
