//! Subscription handlers - Charge creation, verification, webhooks, and queries.
//!
//! Every handler resolves the tenant first and fails closed on unknown ids.
//! Ledger mutations for one (tenant, user) pair run under a shared
//! `KeyedLocks` registry and a conditional version update.

mod check_trial_eligibility;
mod get_plans;
mod get_status;
mod handle_gateway_webhook;
mod purge_stale_records;
mod start_charge;
mod sync_subscription;
mod verify_payment;

#[cfg(test)]
pub(crate) mod test_support;

// Commands
pub use handle_gateway_webhook::{HandleGatewayWebhookCommand, HandleGatewayWebhookHandler};
pub use purge_stale_records::{
    PurgeStaleRecordsCommand, PurgeStaleRecordsHandler, PurgeStaleRecordsResult,
};
pub use start_charge::{StartChargeCommand, StartChargeHandler, StartChargeResult};
pub use sync_subscription::{
    SyncSubscriptionCommand, SyncSubscriptionHandler, SyncSubscriptionResult,
};
pub use verify_payment::{
    PaymentReference, VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult,
};

// Queries
pub use check_trial_eligibility::{
    CheckTrialEligibilityHandler, CheckTrialEligibilityQuery, TrialEligibility,
};
pub use get_plans::{GetPlansHandler, GetPlansQuery, PlansView};
pub use get_status::{GetSubscriptionStatusHandler, GetSubscriptionStatusQuery};
