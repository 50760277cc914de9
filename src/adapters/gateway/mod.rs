//! Payment gateway adapters.
//!
//! Implements the `PaymentGateway` port:
//! - `HttpPaymentGateway` - REST client with per-tenant basic auth
//! - `RetryingGateway` - bounded linear-backoff retry decorator
//! - `MockPaymentGateway` - deterministic fake for tests and local runs
//!
//! # Security
//!
//! - Tenant key secrets are held as `secrecy::SecretString`
//! - Idempotency keys are forwarded as receipt and `X-Idempotency-Key`

mod http_gateway;
mod mock_gateway;
mod retrying_gateway;
mod wire_types;

pub use http_gateway::{HttpPaymentGateway, IDEMPOTENCY_HEADER};
pub use mock_gateway::{GatewayCall, MockPaymentGateway};
pub use retrying_gateway::{RetryPolicy, RetryingGateway};
