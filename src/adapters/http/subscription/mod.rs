//! HTTP adapter for subscription endpoints.
//!
//! - `POST /subscriptions/create-order` - Start a one-time order or subscription
//! - `POST /subscriptions/verify-payment` - Verify a client-reported payment
//! - `POST /subscriptions/sync` - Reconcile with the gateway's status
//! - `GET /subscriptions/plans` - Tenant plan catalog
//! - `GET /subscriptions/status` - Current user's subscription
//! - `GET /subscriptions/trial-eligibility` - Trial availability
//! - `POST /webhooks/gateway` - Gateway webhook deliveries

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{SubscriptionAppState, EVENT_ID_HEADER, SIGNATURE_HEADER};
pub use routes::subscription_router;
