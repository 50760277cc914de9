//! Bounded retry around a `PaymentGateway`.
//!
//! Only transient failures (network, timeout, rate limit, 5xx) are retried.
//! Backoff is linear: `backoff * attempt`. When attempts run out the caller
//! gets `GatewayErrorCode::Unavailable`.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::tenant::TenantConfig;
use crate::ports::{ChargeRequest, GatewayError, GatewayOrder, GatewaySubscription, PaymentGateway};

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Base delay; the wait after attempt `n` is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

pub struct RetryingGateway {
    inner: Arc<dyn PaymentGateway>,
    policy: RetryPolicy,
}

impl RetryingGateway {
    pub fn new(inner: Arc<dyn PaymentGateway>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, GatewayError>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.retryable {
                return Err(err);
            }
            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    operation,
                    attempts = attempt,
                    error = %err,
                    "Gateway retries exhausted"
                );
                return Err(GatewayError::unavailable(attempt, &err));
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient gateway failure, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl PaymentGateway for RetryingGateway {
    async fn create_order(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        self.run("create_order", || self.inner.create_order(tenant, request))
            .await
    }

    async fn create_subscription(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        self.run("create_subscription", || {
            self.inner.create_subscription(tenant, request)
        })
        .await
    }

    async fn fetch_subscription(
        &self,
        tenant: &TenantConfig,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        self.run("fetch_subscription", || {
            self.inner.fetch_subscription(tenant, subscription_id)
        })
        .await
    }
}
