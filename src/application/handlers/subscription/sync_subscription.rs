//! SyncSubscriptionHandler - Reconciles a record with the gateway's view.
//!
//! Used when webhooks were missed. The gateway status is mapped onto the
//! local state machine; statuses that imply no local change are ignored.
//!
//! The gateway is queried before the per-user lock is taken. Under the lock
//! the record is read again and only changed if it still points at the
//! subscription that was fetched.

use std::sync::Arc;

use crate::application::keyed_lock::{KeyedLocks, SubscriptionKey};
use crate::domain::billing::{BillingError, SubscriptionRecord};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::tenant::TenantDirectory;
use crate::ports::{PaymentGateway, SubscriptionLedger};

#[derive(Debug, Clone)]
pub struct SyncSubscriptionCommand {
    pub tenant_id: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct SyncSubscriptionResult {
    pub record: SubscriptionRecord,
    /// Status reported by the gateway.
    pub gateway_status: String,
    /// True if the local record was updated.
    pub changed: bool,
}

/// Local effect of a gateway subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatewayStatusEffect {
    NoChange,
    PastDue,
    Canceled,
}

fn effect_of(gateway_status: &str) -> GatewayStatusEffect {
    match gateway_status {
        "halted" | "pending" => GatewayStatusEffect::PastDue,
        "cancelled" | "completed" | "expired" => GatewayStatusEffect::Canceled,
        _ => GatewayStatusEffect::NoChange,
    }
}

pub struct SyncSubscriptionHandler {
    directory: TenantDirectory,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn SubscriptionLedger>,
    locks: Arc<KeyedLocks<SubscriptionKey>>,
}

impl SyncSubscriptionHandler {
    pub fn new(
        directory: TenantDirectory,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn SubscriptionLedger>,
        locks: Arc<KeyedLocks<SubscriptionKey>>,
    ) -> Self {
        Self {
            directory,
            gateway,
            ledger,
            locks,
        }
    }

    pub async fn handle(
        &self,
        cmd: SyncSubscriptionCommand,
    ) -> Result<SyncSubscriptionResult, BillingError> {
        let tenant = self.directory.resolve(&cmd.tenant_id)?;
        let tenant_id = &tenant.tenant_id;

        let subscription_id = self
            .ledger
            .find(tenant_id, &cmd.user_id)
            .await?
            .and_then(|record| record.external_subscription_id)
            .ok_or(BillingError::SubscriptionNotFound)?;

        let remote = self
            .gateway
            .fetch_subscription(&tenant, &subscription_id)
            .await?;

        let _guard = self
            .locks
            .lock((tenant_id.clone(), cmd.user_id.clone()))
            .await;

        let mut record = self
            .ledger
            .find(tenant_id, &cmd.user_id)
            .await?
            .ok_or(BillingError::SubscriptionNotFound)?;
        if record.external_subscription_id.as_deref() != Some(subscription_id.as_str()) {
            tracing::info!(
                tenant_id = %tenant_id,
                user_id = %cmd.user_id,
                subscription_id = %subscription_id,
                "Record moved to another charge during sync, leaving it alone"
            );
            return Ok(SyncSubscriptionResult {
                record,
                gateway_status: remote.status,
                changed: false,
            });
        }

        let now = Timestamp::now();
        let transition = match effect_of(&remote.status) {
            GatewayStatusEffect::NoChange => None,
            GatewayStatusEffect::PastDue => Some(record.mark_past_due(now)),
            GatewayStatusEffect::Canceled => Some(record.cancel(now)),
        };

        let changed = matches!(transition, Some(Ok(())));
        if let Some(Err(err)) = transition {
            tracing::debug!(
                tenant_id = %tenant_id,
                user_id = %cmd.user_id,
                gateway_status = %remote.status,
                error = %err,
                "Gateway status needs no local transition"
            );
        }

        let record = if changed {
            let saved = self.ledger.update(&record).await?;
            tracing::info!(
                tenant_id = %tenant_id,
                user_id = %cmd.user_id,
                gateway_status = %remote.status,
                status = %saved.status,
                "Subscription synced from gateway"
            );
            saved
        } else {
            record
        };

        Ok(SyncSubscriptionResult {
            record,
            gateway_status: remote.status,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::subscription::test_support::{user, Fixture, TENANT};
    use crate::domain::billing::{ChargeKind, SubscriptionStatus};
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::in_memory::InMemorySubscriptionLedger;
    use crate::domain::tenant::{PlanType, TenantConfig};
    use crate::ports::{
        ChargeRequest, GatewayError, GatewayOrder, GatewaySubscription, SubscriptionLedger,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Gateway that notes how many lock keys are held when a subscription
    /// is fetched, and can move the user's record to a one-time charge
    /// mid-fetch.
    struct ObservingGateway {
        inner: Arc<MockPaymentGateway>,
        locks: Arc<KeyedLocks<SubscriptionKey>>,
        ledger: Arc<InMemorySubscriptionLedger>,
        move_record: bool,
        held_during_fetch: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl PaymentGateway for ObservingGateway {
        async fn create_order(
            &self,
            tenant: &TenantConfig,
            request: &ChargeRequest,
        ) -> Result<GatewayOrder, GatewayError> {
            self.inner.create_order(tenant, request).await
        }

        async fn create_subscription(
            &self,
            tenant: &TenantConfig,
            request: &ChargeRequest,
        ) -> Result<GatewaySubscription, GatewayError> {
            self.inner.create_subscription(tenant, request).await
        }

        async fn fetch_subscription(
            &self,
            tenant: &TenantConfig,
            subscription_id: &str,
        ) -> Result<GatewaySubscription, GatewayError> {
            self.held_during_fetch
                .lock()
                .unwrap()
                .push(self.locks.active_keys());
            if self.move_record {
                let mut record = self
                    .ledger
                    .find(&tenant.tenant_id, &user("u1"))
                    .await
                    .unwrap()
                    .unwrap();
                record.external_subscription_id = None;
                self.ledger.update(&record).await.unwrap();
            }
            self.inner.fetch_subscription(tenant, subscription_id).await
        }
    }

    fn observing(fx: &Fixture, move_record: bool) -> Arc<ObservingGateway> {
        Arc::new(ObservingGateway {
            inner: fx.gateway.clone(),
            locks: fx.locks.clone(),
            ledger: fx.ledger.clone(),
            move_record,
            held_during_fetch: Mutex::new(Vec::new()),
        })
    }

    fn handler_with(fx: &Fixture, gateway: Arc<ObservingGateway>) -> SyncSubscriptionHandler {
        SyncSubscriptionHandler::new(
            fx.directory.clone(),
            gateway,
            fx.ledger.clone(),
            fx.locks.clone(),
        )
    }

    fn command() -> SyncSubscriptionCommand {
        SyncSubscriptionCommand {
            tenant_id: TENANT.to_string(),
            user_id: user("u1"),
        }
    }

    async fn seeded(fx: &Fixture, gateway_status: &str) -> SubscriptionRecord {
        fx.gateway.set_subscription_status("sub_seed", gateway_status);
        fx.seed(fx.active_record("u1", PlanType::Monthly)).await
    }

    #[test]
    fn status_mapping() {
        assert_eq!(effect_of("active"), GatewayStatusEffect::NoChange);
        assert_eq!(effect_of("authenticated"), GatewayStatusEffect::NoChange);
        assert_eq!(effect_of("halted"), GatewayStatusEffect::PastDue);
        assert_eq!(effect_of("completed"), GatewayStatusEffect::Canceled);
        assert_eq!(effect_of("something-new"), GatewayStatusEffect::NoChange);
    }

    #[tokio::test]
    async fn halted_subscription_becomes_past_due() {
        let fx = Fixture::new();
        seeded(&fx, "halted").await;

        let result = fx.sync_handler().handle(command()).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.record.status, SubscriptionStatus::PastDue);
        assert_eq!(fx.record("u1").await.unwrap().status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn cancelled_subscription_keeps_end_date() {
        let fx = Fixture::new();
        let before = seeded(&fx, "cancelled").await;

        let result = fx.sync_handler().handle(command()).await.unwrap();

        assert_eq!(result.record.status, SubscriptionStatus::Canceled);
        assert_eq!(result.record.end_date, before.end_date);
    }

    #[tokio::test]
    async fn active_subscription_is_left_alone() {
        let fx = Fixture::new();
        let before = seeded(&fx, "active").await;

        let result = fx.sync_handler().handle(command()).await.unwrap();

        assert!(!result.changed);
        assert_eq!(result.gateway_status, "active");
        assert_eq!(fx.record("u1").await.unwrap(), before);
    }

    #[tokio::test]
    async fn one_time_record_cannot_sync() {
        let fx = Fixture::new();
        let plan = fx.plan(PlanType::Monthly);
        let record = SubscriptionRecord::activated(
            fx.tenant().tenant_id.clone(),
            user("u1"),
            &plan,
            ChargeKind::OneTime,
            "order_1",
            "pay_1",
            Timestamp::now(),
        );
        fx.seed(record).await;

        let err = fx.sync_handler().handle(command()).await.unwrap_err();
        assert_eq!(err, BillingError::SubscriptionNotFound);
        assert!(fx.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn gateway_outage_is_surfaced() {
        let fx = Fixture::new();
        seeded(&fx, "active").await;
        fx.gateway
            .fail_next(GatewayError::unavailable(3, &GatewayError::network("reset")));

        let err = fx.sync_handler().handle(command()).await.unwrap_err();
        assert!(matches!(err, BillingError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn lock_is_free_while_gateway_is_queried() {
        let fx = Fixture::new();
        seeded(&fx, "halted").await;
        let gateway = observing(&fx, false);

        let result = handler_with(&fx, gateway.clone()).handle(command()).await.unwrap();

        assert!(result.changed);
        assert_eq!(*gateway.held_during_fetch.lock().unwrap(), vec![0]);
        assert_eq!(fx.locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn record_moved_during_fetch_is_left_alone() {
        let fx = Fixture::new();
        seeded(&fx, "cancelled").await;
        let gateway = observing(&fx, true);

        let result = handler_with(&fx, gateway).handle(command()).await.unwrap();

        assert!(!result.changed);
        assert_eq!(result.gateway_status, "cancelled");
        let stored = fx.record("u1").await.unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(stored.external_subscription_id, None);
        assert_eq!(result.record, stored);
    }
}
