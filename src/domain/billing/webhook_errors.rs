//! Webhook error types for gateway webhook handling.
//!
//! Status codes drive the gateway's redelivery: 2xx acknowledges, 4xx
//! drops the delivery, 5xx asks for a retry.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Package header missing or not a supported tenant.
    #[error("Unsupported tenant")]
    UnsupportedTenant,

    /// Signature header absent.
    #[error("Missing signature")]
    MissingSignature,

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Body is not a decodable gateway event.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// No local record matches the event's subscription.
    #[error("Subscription record not found: {0}")]
    RecordNotFound(String),

    /// Storage failed, or a concurrent update won the race.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the gateway should redeliver.
    ///
    /// A missing record may be a verify-payment that has not committed yet.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Database(_) | WebhookError::RecordNotFound(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::UnsupportedTenant
            | WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::RecordNotFound(_) | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Signature failures share one fixed message so responses cannot be used
    /// to probe the HMAC scheme.
    pub fn public_message(&self) -> String {
        match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                "Invalid signature".to_string()
            }
            WebhookError::Database(_) => "Temporary failure, retry later".to_string(),
            other => other.to_string(),
        }
    }
}
