//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Port
//!
//! - `PaymentGateway` - Order/subscription creation and status fetch
//!
//! ## Persistence Ports
//!
//! - `SubscriptionLedger` - Per-user subscription records with conditional writes
//! - `PendingChargeRepository` - Charges awaiting payment verification
//! - `WebhookEventRepository` - Webhook dedup ledger

mod payment_gateway;
mod pending_charge_repository;
mod subscription_ledger;
mod webhook_event_repository;

pub use payment_gateway::{
    ChargeRequest, GatewayError, GatewayErrorCode, GatewayOrder, GatewaySubscription,
    PaymentGateway,
};
pub use pending_charge_repository::PendingChargeRepository;
pub use subscription_ledger::SubscriptionLedger;
pub use webhook_event_repository::{SaveResult, WebhookEventRepository, WebhookResult};
