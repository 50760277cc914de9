//! Billing module - Subscription records, pending charges, and webhooks.
//!
//! # Overview
//!
//! A purchase moves through three records:
//! 1. `PendingCharge` - created when the gateway accepts an order/subscription
//! 2. `SubscriptionRecord` - created or updated when the payment is verified
//! 3. `WebhookEventRecord` - dedup ledger for gateway notifications
//!
//! Signature checks (`SignatureVerifier`) always run before any of these
//! records is read or written.

mod errors;
mod gateway_event;
mod pending_charge;
mod record;
mod signature;
mod status;
mod webhook_errors;
mod webhook_event;

pub use errors::BillingError;
pub use gateway_event::{EventAction, EventTypeMap, GatewayEvent};
pub use pending_charge::{ChargeKind, IdempotencyKey, PendingCharge};
pub use record::{ChargeOutcome, SubscriptionRecord};
pub use signature::SignatureVerifier;
pub use status::SubscriptionStatus;
pub use webhook_errors::WebhookError;
pub use webhook_event::{payload_hash, WebhookEventRecord};
