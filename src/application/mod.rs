//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers mutate the ledger; query handlers only read it (apart from
//! lazily expiring lapsed records).

pub mod handlers;
pub mod keyed_lock;

pub use handlers::{
    // Commands
    HandleGatewayWebhookCommand, HandleGatewayWebhookHandler,
    PaymentReference, VerifyPaymentCommand, VerifyPaymentHandler, VerifyPaymentResult,
    PurgeStaleRecordsCommand, PurgeStaleRecordsHandler, PurgeStaleRecordsResult,
    StartChargeCommand, StartChargeHandler, StartChargeResult,
    SyncSubscriptionCommand, SyncSubscriptionHandler, SyncSubscriptionResult,
    // Queries
    CheckTrialEligibilityHandler, CheckTrialEligibilityQuery, TrialEligibility,
    GetPlansHandler, GetPlansQuery, PlansView,
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery,
};
pub use keyed_lock::{KeyedGuard, KeyedLocks, SubscriptionKey};
