//! HandleGatewayWebhookHandler - Command handler for gateway webhook deliveries.
//!
//! Order of operations:
//! 1. Resolve the tenant and verify the signature over the raw bytes
//! 2. Decode the event and consult the dedup ledger
//! 3. Record the delivery as received (unprocessed)
//! 4. Apply the mapped action to the subscription record under the per-user lock
//! 5. Mark the delivery processed
//!
//! If step 4 fails the delivery stays unprocessed and the error is retryable,
//! so the gateway's redelivery becomes the retry mechanism. An event for a
//! subscription no record points to is only retried while a pending charge
//! for it still exists; otherwise it can never match and is acknowledged.

use std::sync::Arc;

use crate::application::keyed_lock::{KeyedLocks, SubscriptionKey};
use crate::domain::billing::{
    ChargeOutcome, EventAction, EventTypeMap, GatewayEvent, SignatureVerifier,
    SubscriptionRecord, WebhookError, WebhookEventRecord,
};
use crate::domain::foundation::{DomainError, InvalidTransition, Timestamp};
use crate::domain::tenant::{TenantDirectory, TenantId};
use crate::ports::{
    PendingChargeRepository, SubscriptionLedger, WebhookEventRepository, WebhookResult,
};

const MAX_WRITE_ATTEMPTS: u32 = 2;

/// Command to handle one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleGatewayWebhookCommand {
    /// Package header, if present.
    pub tenant_id: Option<String>,
    /// Signature header, if present.
    pub signature: Option<String>,
    /// Event id header, if present.
    pub event_id: Option<String>,
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
}

/// Handler for gateway webhooks.
pub struct HandleGatewayWebhookHandler {
    directory: TenantDirectory,
    ledger: Arc<dyn SubscriptionLedger>,
    pending_charges: Arc<dyn PendingChargeRepository>,
    events: Arc<dyn WebhookEventRepository>,
    locks: Arc<KeyedLocks<SubscriptionKey>>,
    event_types: EventTypeMap,
}

impl HandleGatewayWebhookHandler {
    pub fn new(
        directory: TenantDirectory,
        ledger: Arc<dyn SubscriptionLedger>,
        pending_charges: Arc<dyn PendingChargeRepository>,
        events: Arc<dyn WebhookEventRepository>,
        locks: Arc<KeyedLocks<SubscriptionKey>>,
        event_types: EventTypeMap,
    ) -> Self {
        Self {
            directory,
            ledger,
            pending_charges,
            events,
            locks,
            event_types,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleGatewayWebhookCommand,
    ) -> Result<WebhookResult, WebhookError> {
        // 1. Tenant and signature, before the body is decoded
        let tenant = cmd
            .tenant_id
            .as_deref()
            .and_then(|id| self.directory.resolve(id).ok())
            .ok_or(WebhookError::UnsupportedTenant)?;
        let signature = cmd
            .signature
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        if !SignatureVerifier::verify_webhook(
            &cmd.payload,
            signature,
            &tenant.credentials.webhook_secret,
        ) {
            tracing::warn!(
                security_event = true,
                tenant_id = %tenant.tenant_id,
                body_len = cmd.payload.len(),
                "Webhook signature verification failed"
            );
            return Err(WebhookError::InvalidSignature);
        }
        let tenant_id = &tenant.tenant_id;

        // 2. Decode and dedup
        let event = GatewayEvent::parse(&cmd.payload, cmd.event_id.as_deref())?;
        if self.is_processed(tenant_id, &event.event_id).await? {
            tracing::debug!(
                tenant_id = %tenant_id,
                event_id = %event.event_id,
                "Webhook already processed"
            );
            return Ok(WebhookResult::AlreadyProcessed);
        }

        // 3. Record the delivery. An existing unprocessed row is an earlier
        //    attempt that did not finish, so it is applied again.
        let received = WebhookEventRecord::received(
            tenant_id.clone(),
            event.event_id.clone(),
            event.event_type.clone(),
            &cmd.payload,
            Timestamp::now(),
        );
        self.events
            .record_received(&received)
            .await
            .map_err(storage)?;

        // 4. Route
        let action = self.event_types.action_for(&event.event_type);
        let subscription_id = match (action, event.subscription_id.as_deref()) {
            (EventAction::Ignore, _) => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "Webhook event type not handled"
                );
                self.mark_processed(tenant_id, &event.event_id).await?;
                return Ok(WebhookResult::Ignored);
            }
            (_, None) => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    "Webhook carries no subscription reference"
                );
                self.mark_processed(tenant_id, &event.event_id).await?;
                return Ok(WebhookResult::Ignored);
            }
            (_, Some(id)) => id,
        };

        let owner = match self
            .ledger
            .find_by_external_subscription_id(tenant_id, subscription_id)
            .await
            .map_err(storage)?
        {
            Some(record) => record.user_id,
            None => return self.unmatched(tenant_id, &event, subscription_id).await,
        };

        // 5. Apply under the same lock verify-payment uses
        let _guard = self.locks.lock((tenant_id.clone(), owner)).await;
        if self.is_processed(tenant_id, &event.event_id).await? {
            return Ok(WebhookResult::AlreadyProcessed);
        }
        self.apply(tenant_id, action, &event, subscription_id).await?;

        // 6. Only now is the delivery done
        self.mark_processed(tenant_id, &event.event_id).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            subscription_id,
            "Webhook processed"
        );
        Ok(WebhookResult::Processed)
    }

    async fn apply(
        &self,
        tenant_id: &TenantId,
        action: EventAction,
        event: &GatewayEvent,
        subscription_id: &str,
    ) -> Result<(), WebhookError> {
        let mut attempt = 1;
        loop {
            let mut record = self.find_record(tenant_id, subscription_id).await?;
            let now = Timestamp::now();

            let changed = match action {
                EventAction::Charged => self.charge(&mut record, event, now),
                EventAction::Cancelled => applied(record.cancel(now), event),
                EventAction::Failed => applied(record.mark_past_due(now), event),
                EventAction::Ignore => false,
            };
            if !changed {
                return Ok(());
            }

            match self.ledger.update(&record).await {
                Ok(saved) => {
                    tracing::debug!(
                        user_id = %saved.user_id,
                        status = %saved.status,
                        version = saved.version,
                        "Subscription record updated from webhook"
                    );
                    return Ok(());
                }
                Err(err) if err.is_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        subscription_id,
                        attempt,
                        "Ledger conflict while applying webhook, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(storage(err)),
            }
        }
    }

    fn charge(&self, record: &mut SubscriptionRecord, event: &GatewayEvent, now: Timestamp) -> bool {
        let plan = match self
            .directory
            .resolve_plan(record.tenant_id.as_str(), record.plan_type)
        {
            Ok(plan) => plan,
            Err(err) => {
                tracing::error!(
                    tenant_id = %record.tenant_id,
                    plan_type = %record.plan_type,
                    error = %err,
                    "Charged webhook for a plan missing from the catalog"
                );
                return false;
            }
        };
        match record.apply_charge(plan.duration_days, event.payment_id.as_deref(), now) {
            Ok(ChargeOutcome::Extended) => true,
            Ok(ChargeOutcome::AlreadyApplied) => {
                tracing::debug!(
                    event_id = %event.event_id,
                    "Charge already applied to this record"
                );
                false
            }
            Err(transition) => applied(Err(transition), event),
        }
    }

    async fn find_record(
        &self,
        tenant_id: &TenantId,
        subscription_id: &str,
    ) -> Result<SubscriptionRecord, WebhookError> {
        self.ledger
            .find_by_external_subscription_id(tenant_id, subscription_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    subscription_id,
                    "Subscription record vanished while applying webhook"
                );
                WebhookError::RecordNotFound(subscription_id.to_string())
            })
    }

    /// No record points at `subscription_id`. While its charge is still
    /// pending, verification may yet create the record, so ask for
    /// redelivery. Without one (abandoned checkout, or a record that moved
    /// to another charge) the event can never apply.
    async fn unmatched(
        &self,
        tenant_id: &TenantId,
        event: &GatewayEvent,
        subscription_id: &str,
    ) -> Result<WebhookResult, WebhookError> {
        let pending = self
            .pending_charges
            .find(tenant_id, subscription_id)
            .await
            .map_err(storage)?;
        if pending.is_some() {
            tracing::warn!(
                tenant_id = %tenant_id,
                event_id = %event.event_id,
                subscription_id,
                "Webhook arrived before payment verification, asking for redelivery"
            );
            return Err(WebhookError::RecordNotFound(subscription_id.to_string()));
        }

        tracing::info!(
            tenant_id = %tenant_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            subscription_id,
            "Webhook matches no subscription record or pending charge"
        );
        self.mark_processed(tenant_id, &event.event_id).await?;
        Ok(WebhookResult::Ignored)
    }

    async fn is_processed(&self, tenant_id: &TenantId, event_id: &str) -> Result<bool, WebhookError> {
        Ok(self
            .events
            .find(tenant_id, event_id)
            .await
            .map_err(storage)?
            .map(|e| e.processed)
            .unwrap_or(false))
    }

    async fn mark_processed(&self, tenant_id: &TenantId, event_id: &str) -> Result<(), WebhookError> {
        self.events
            .mark_processed(tenant_id, event_id, Timestamp::now())
            .await
            .map_err(storage)
    }
}

/// A transition the record's state does not allow is acknowledged as a no-op.
fn applied(result: Result<(), InvalidTransition>, event: &GatewayEvent) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                error = %err,
                "Webhook does not apply to current status"
            );
            false
        }
    }
}

fn storage(err: DomainError) -> WebhookError {
    WebhookError::Database(err.to_string())
}
