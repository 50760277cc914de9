//! Billing error taxonomy surfaced by the reconciliation handlers.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::domain::tenant::TenantError;

/// Errors returned by charge creation, payment verification, and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BillingError {
    #[error("Unsupported tenant: {0}")]
    UnsupportedTenant(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    /// Tampered or forged signature. Never carries detail.
    #[error("Invalid signature")]
    InvalidSignature,

    /// No pending charge matches the submitted identifiers.
    #[error("Unknown charge: {0}")]
    UnknownCharge(String),

    #[error("Trial already used")]
    TrialAlreadyUsed,

    /// Gateway unreachable after retries. Safe to retry the whole operation.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Gateway refused the request.
    #[error("Payment gateway rejected the request: {0}")]
    GatewayRejected(String),

    /// A concurrent update won the race, even after one internal retry.
    #[error("Concurrent update conflict: {0}")]
    PersistenceConflict(String),

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BillingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::UnsupportedTenant(_)
            | BillingError::PlanNotFound(_)
            | BillingError::InvalidSignature
            | BillingError::UnknownCharge(_)
            | BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::TrialAlreadyUsed => StatusCode::CONFLICT,
            BillingError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            BillingError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BillingError::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
            BillingError::PersistenceConflict(_) | BillingError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::UnsupportedTenant(_) => "UNSUPPORTED_TENANT",
            BillingError::PlanNotFound(_) => "PLAN_NOT_FOUND",
            BillingError::InvalidSignature => "INVALID_SIGNATURE",
            BillingError::UnknownCharge(_) => "UNKNOWN_CHARGE",
            BillingError::TrialAlreadyUsed => "TRIAL_ALREADY_USED",
            BillingError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            BillingError::GatewayRejected(_) => "GATEWAY_REJECTED",
            BillingError::PersistenceConflict(_) => "PERSISTENCE_CONFLICT",
            BillingError::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            BillingError::Validation(_) => "VALIDATION_FAILED",
            BillingError::Infrastructure(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show clients. Server-side detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            BillingError::PersistenceConflict(_) => {
                "Request conflicted with a concurrent update, please retry".to_string()
            }
            BillingError::Infrastructure(_) => "Internal server error".to_string(),
            BillingError::GatewayUnavailable(_) => {
                "Payment gateway unavailable, please retry".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<TenantError> for BillingError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::UnsupportedTenant(t) => BillingError::UnsupportedTenant(t),
            TenantError::PlanNotFound { plan, .. } => BillingError::PlanNotFound(plan),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::Conflict => BillingError::PersistenceConflict(err.message),
            ErrorCode::ValidationFailed => BillingError::Validation(err.message),
            _ => BillingError::Infrastructure(err.to_string()),
        }
    }
}
