//! Payment gateway port.
//!
//! Contract for the external payment service that creates orders and
//! subscriptions. Every call is made with the credentials of one tenant.
//!
//! # Idempotency
//!
//! Callers pass an `IdempotencyKey` with every create call. Implementations
//! forward it unchanged so a retried request does not create a second
//! external charge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::billing::{BillingError, IdempotencyKey};
use crate::domain::foundation::UserId;
use crate::domain::tenant::{PlanDefinition, TenantConfig};

/// Port for order and subscription creation at the gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a one-time order for the plan's price.
    async fn create_order(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Create a recurring subscription on the plan's external plan id.
    async fn create_subscription(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewaySubscription, GatewayError>;

    /// Fetch the current state of a subscription.
    async fn fetch_subscription(
        &self,
        tenant: &TenantConfig,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError>;
}

/// Everything the gateway needs to create a charge.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub plan: PlanDefinition,
    pub user_id: UserId,
    pub idempotency_key: IdempotencyKey,
}

/// Order created at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub external_order_id: String,
    pub amount_minor_units: u64,
    pub currency: String,
}

/// Subscription as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySubscription {
    pub external_subscription_id: String,
    pub customer_id: Option<String>,
    /// Gateway status string, e.g. `created`, `active`, `halted`.
    pub status: String,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub message: String,
    /// Gateway's own error code, if it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Timeout, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::Rejected, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(GatewayErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Retries exhausted on a transient failure.
    pub fn unavailable(attempts: u32, last: &GatewayError) -> Self {
        Self::new(
            GatewayErrorCode::Unavailable,
            format!("gave up after {} attempts: {}", attempts, last.message),
        )
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for BillingError {
    fn from(err: GatewayError) -> Self {
        match err.code {
            GatewayErrorCode::NotFound => BillingError::SubscriptionNotFound,
            GatewayErrorCode::Rejected
            | GatewayErrorCode::AuthenticationError
            | GatewayErrorCode::InvalidResponse => BillingError::GatewayRejected(err.message),
            GatewayErrorCode::NetworkError
            | GatewayErrorCode::Timeout
            | GatewayErrorCode::RateLimited
            | GatewayErrorCode::ServerError
            | GatewayErrorCode::Unavailable => BillingError::GatewayUnavailable(err.message),
        }
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Connection failed before a response arrived.
    NetworkError,
    Timeout,
    RateLimited,
    /// Gateway answered 5xx.
    ServerError,
    /// Gateway answered 4xx for the request itself.
    Rejected,
    AuthenticationError,
    NotFound,
    /// 2xx with a body we could not decode.
    InvalidResponse,
    /// Transient failure that outlived the retry policy.
    Unavailable,
}

impl GatewayErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimited
                | GatewayErrorCode::ServerError
        )
    }
}

impl fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::RateLimited => "rate_limited",
            GatewayErrorCode::ServerError => "server_error",
            GatewayErrorCode::Rejected => "rejected",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::InvalidResponse => "invalid_response",
            GatewayErrorCode::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}
