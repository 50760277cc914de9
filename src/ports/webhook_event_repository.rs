//! WebhookEventRepository port - Dedup ledger for gateway webhooks.
//!
//! Gateways redeliver webhooks on timeouts and 5xx responses, and sometimes
//! after a 2xx they never saw. Every delivery is recorded here before it is
//! applied, keyed by `(tenant_id, external_event_id)`.

use async_trait::async_trait;

use crate::domain::billing::WebhookEventRecord;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::tenant::TenantId;

/// Result of attempting to record a webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time seeing this event.
    Inserted,
    /// Another delivery of this event was already recorded.
    AlreadyExists,
}

/// Outcome reported back to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// Event was applied to the ledger.
    Processed,
    /// Event was already processed (idempotent skip).
    AlreadyProcessed,
    /// Event type or payload needs no ledger change.
    Ignored,
}

/// Port for storing webhook deliveries.
///
/// Implementations should rely on a primary key over
/// `(tenant_id, external_event_id)` so concurrent deliveries race safely.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a recorded event.
    async fn find(
        &self,
        tenant_id: &TenantId,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Record a delivery with `processed = false`.
    ///
    /// Uses insert-if-absent semantics.
    async fn record_received(&self, record: &WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Flag an event as processed.
    async fn mark_processed(
        &self,
        tenant_id: &TenantId,
        external_event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Delete processed events received before `cutoff`. Unprocessed events
    /// are kept so a late redelivery can still be reconciled.
    async fn delete_processed_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
