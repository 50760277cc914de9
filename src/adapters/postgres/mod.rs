//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionLedger` - Subscription records with versioned updates
//! - `PostgresPendingChargeRepository` - Charges awaiting verification
//! - `PostgresWebhookEventRepository` - Webhook dedup ledger
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod pending_charge_repository;
mod subscription_ledger;
mod webhook_event_repository;

pub use pending_charge_repository::PostgresPendingChargeRepository;
pub use subscription_ledger::PostgresSubscriptionLedger;
pub use webhook_event_repository::PostgresWebhookEventRepository;
