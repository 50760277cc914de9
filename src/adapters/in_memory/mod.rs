//! In-memory adapters - Repository implementations backed by `tokio` maps.
//!
//! Used for local development (empty database url) and for tests. State is
//! lost on restart and not shared between processes.

mod pending_charge_repository;
mod subscription_ledger;
mod webhook_event_repository;

pub use pending_charge_repository::InMemoryPendingChargeRepository;
pub use subscription_ledger::InMemorySubscriptionLedger;
pub use webhook_event_repository::InMemoryWebhookEventRepository;
