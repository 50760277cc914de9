//! PurgeStaleRecordsHandler - Retention sweep for dedup and pending rows.
//!
//! Only processed webhook events are purged; an unprocessed one is still
//! waiting for a redelivery to finish it.

use std::sync::Arc;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{PendingChargeRepository, WebhookEventRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStaleRecordsCommand {
    pub webhook_retention_days: i64,
    pub pending_charge_ttl_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PurgeStaleRecordsResult {
    pub webhook_events_deleted: u64,
    pub pending_charges_deleted: u64,
}

pub struct PurgeStaleRecordsHandler {
    events: Arc<dyn WebhookEventRepository>,
    pending_charges: Arc<dyn PendingChargeRepository>,
}

impl PurgeStaleRecordsHandler {
    pub fn new(
        events: Arc<dyn WebhookEventRepository>,
        pending_charges: Arc<dyn PendingChargeRepository>,
    ) -> Self {
        Self {
            events,
            pending_charges,
        }
    }

    pub async fn handle(
        &self,
        cmd: PurgeStaleRecordsCommand,
    ) -> Result<PurgeStaleRecordsResult, DomainError> {
        let now = Timestamp::now();

        let webhook_events_deleted = self
            .events
            .delete_processed_before(now.minus_days(cmd.webhook_retention_days))
            .await?;
        let pending_charges_deleted = self
            .pending_charges
            .delete_created_before(now.minus_hours(cmd.pending_charge_ttl_hours))
            .await?;

        if webhook_events_deleted > 0 || pending_charges_deleted > 0 {
            tracing::info!(
                webhook_events_deleted,
                pending_charges_deleted,
                "Retention sweep removed stale records"
            );
        }

        Ok(PurgeStaleRecordsResult {
            webhook_events_deleted,
            pending_charges_deleted,
        })
    }
}
