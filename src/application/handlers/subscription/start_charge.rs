//! StartChargeHandler - Command handler for creating a gateway order or subscription.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::billing::{BillingError, ChargeKind, IdempotencyKey, PendingCharge};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::tenant::{PlanType, TenantConfig, TenantDirectory};
use crate::ports::{ChargeRequest, PaymentGateway, PendingChargeRepository, SubscriptionLedger};

/// Command to start a purchase.
#[derive(Debug, Clone)]
pub struct StartChargeCommand {
    /// Raw tenant identifier from the package header.
    pub tenant_id: String,
    pub user_id: UserId,
    pub plan_type: PlanType,
    /// `None` is treated as recurring. Ignored for trial plans.
    pub recurring: Option<bool>,
    /// Client nonce for the idempotency key. A fresh one is generated if absent.
    pub idempotency_nonce: Option<String>,
}

/// What the client needs to open the gateway checkout.
///
/// The two shapes are mutually exclusive: an order never carries a
/// subscription id and vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartChargeResult {
    OneTimeOrder {
        order_id: String,
        amount_minor_units: u64,
        currency: String,
        plan_type: PlanType,
    },
    RecurringSubscription {
        subscription_id: String,
        customer_id: Option<String>,
        amount_minor_units: u64,
        currency: String,
        plan_type: PlanType,
    },
}

impl StartChargeResult {
    /// Gateway id of the created order or subscription.
    pub fn external_id(&self) -> &str {
        match self {
            StartChargeResult::OneTimeOrder { order_id, .. } => order_id,
            StartChargeResult::RecurringSubscription {
                subscription_id, ..
            } => subscription_id,
        }
    }
}

/// Handler for creating charges at the gateway.
///
/// A pending charge is recorded only after the gateway call succeeds, so a
/// failed call leaves no local state behind.
pub struct StartChargeHandler {
    directory: TenantDirectory,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn SubscriptionLedger>,
    pending_charges: Arc<dyn PendingChargeRepository>,
}

impl StartChargeHandler {
    pub fn new(
        directory: TenantDirectory,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn SubscriptionLedger>,
        pending_charges: Arc<dyn PendingChargeRepository>,
    ) -> Self {
        Self {
            directory,
            gateway,
            ledger,
            pending_charges,
        }
    }

    pub async fn handle(&self, cmd: StartChargeCommand) -> Result<StartChargeResult, BillingError> {
        // 1. Resolve tenant and plan
        let tenant = self.directory.resolve(&cmd.tenant_id)?;
        let plan = self.directory.resolve_plan(&cmd.tenant_id, cmd.plan_type)?;

        // 2. Trials are single-use per tenant
        if plan.plan_type.is_trial() {
            let trial_used = self
                .ledger
                .find(&tenant.tenant_id, &cmd.user_id)
                .await?
                .map(|record| record.trial_used)
                .unwrap_or(false);
            if trial_used {
                tracing::info!(
                    tenant_id = %tenant.tenant_id,
                    user_id = %cmd.user_id,
                    "Trial purchase refused, trial already used"
                );
                return Err(BillingError::TrialAlreadyUsed);
            }
        }

        // 3. Decide how the gateway collects the payment
        let kind = charge_kind(&tenant, plan.plan_type, cmd.recurring);

        let nonce = cmd
            .idempotency_nonce
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let request = ChargeRequest {
            idempotency_key: IdempotencyKey::derive(&cmd.user_id, plan.plan_type, &nonce),
            user_id: cmd.user_id.clone(),
            plan,
        };

        // 4. Create the charge at the gateway. Nothing is persisted on failure.
        let result = match kind {
            ChargeKind::OneTime => {
                let order = self.gateway.create_order(&tenant, &request).await?;
                StartChargeResult::OneTimeOrder {
                    order_id: order.external_order_id,
                    amount_minor_units: order.amount_minor_units,
                    currency: order.currency,
                    plan_type: request.plan.plan_type,
                }
            }
            ChargeKind::Recurring => {
                let subscription = self.gateway.create_subscription(&tenant, &request).await?;
                StartChargeResult::RecurringSubscription {
                    subscription_id: subscription.external_subscription_id,
                    customer_id: subscription.customer_id,
                    amount_minor_units: request.plan.amount_minor_units,
                    currency: request.plan.currency.clone(),
                    plan_type: request.plan.plan_type,
                }
            }
        };

        // 5. Remember the charge so verification can trust it
        let charge = PendingCharge {
            external_id: result.external_id().to_string(),
            tenant_id: tenant.tenant_id.clone(),
            user_id: cmd.user_id.clone(),
            plan_type: request.plan.plan_type,
            amount_minor_units: request.plan.amount_minor_units,
            currency: request.plan.currency.clone(),
            kind,
            idempotency_key: request.idempotency_key.clone(),
            created_at: Timestamp::now(),
        };
        self.record_pending(&charge).await?;

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            user_id = %cmd.user_id,
            plan_type = %charge.plan_type,
            kind = charge.kind.as_str(),
            external_id = %charge.external_id,
            "Charge created"
        );

        Ok(result)
    }

    /// Saves the pending charge. A retry with the same nonce gets the same
    /// gateway id back, so an identical existing charge counts as success.
    async fn record_pending(&self, charge: &PendingCharge) -> Result<(), BillingError> {
        match self.pending_charges.save(charge).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_conflict() => {
                let existing = self
                    .pending_charges
                    .find(&charge.tenant_id, &charge.external_id)
                    .await?;
                match existing {
                    Some(existing)
                        if existing.belongs_to(&charge.tenant_id, &charge.user_id)
                            && existing.kind == charge.kind =>
                    {
                        tracing::debug!(
                            external_id = %charge.external_id,
                            "Pending charge already recorded for this request"
                        );
                        Ok(())
                    }
                    _ => Err(BillingError::PersistenceConflict(format!(
                        "pending charge {} already exists",
                        charge.external_id
                    ))),
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Trials follow the tenant setting; other plans default to recurring.
fn charge_kind(tenant: &TenantConfig, plan_type: PlanType, recurring: Option<bool>) -> ChargeKind {
    let recurring = if plan_type.is_trial() {
        tenant.trial_is_recurring()
    } else {
        recurring.unwrap_or(true)
    };
    if recurring {
        ChargeKind::Recurring
    } else {
        ChargeKind::OneTime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::subscription::test_support::{user, Fixture, TENANT};
    use crate::domain::tenant::test_support::sample_tenant;
    use crate::ports::GatewayError;

    fn command(plan_type: PlanType, recurring: Option<bool>) -> StartChargeCommand {
        StartChargeCommand {
            tenant_id: TENANT.to_string(),
            user_id: user("u1"),
            plan_type,
            recurring,
            idempotency_nonce: None,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Response shapes
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn one_time_purchase_creates_order() {
        let fx = Fixture::new();
        let result = fx
            .start_charge_handler()
            .handle(command(PlanType::Monthly, Some(false)))
            .await
            .unwrap();

        match &result {
            StartChargeResult::OneTimeOrder {
                order_id,
                amount_minor_units,
                currency,
                ..
            } => {
                assert!(order_id.starts_with("order_"));
                assert_eq!(*amount_minor_units, 11700);
                assert_eq!(currency, "INR");
            }
            other => panic!("expected order, got {:?}", other),
        }
        assert_eq!(fx.gateway.attempts("create_subscription"), 0);

        let tenant = fx.tenant();
        let charge = fx
            .pending
            .find(&tenant.tenant_id, result.external_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(charge.kind, ChargeKind::OneTime);
        assert_eq!(charge.plan_type, PlanType::Monthly);
    }

    #[tokio::test]
    async fn recurring_is_the_default() {
        let fx = Fixture::new();
        let result = fx
            .start_charge_handler()
            .handle(command(PlanType::Yearly, None))
            .await
            .unwrap();

        match result {
            StartChargeResult::RecurringSubscription {
                subscription_id,
                amount_minor_units,
                ..
            } => {
                assert!(subscription_id.starts_with("sub_"));
                assert_eq!(amount_minor_units, 99900);
            }
            other => panic!("expected subscription, got {:?}", other),
        }
        assert_eq!(fx.gateway.attempts("create_order"), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Trials
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn trial_ignores_caller_recurring_flag() {
        let fx = Fixture::new();
        let result = fx
            .start_charge_handler()
            .handle(command(PlanType::Trial, Some(false)))
            .await
            .unwrap();
        assert!(matches!(result, StartChargeResult::RecurringSubscription { .. }));

        let mut tenant = sample_tenant(TENANT);
        tenant.trial_subscriptions = false;
        let fx = Fixture::with_tenants(vec![tenant]);
        let result = fx
            .start_charge_handler()
            .handle(command(PlanType::Trial, Some(true)))
            .await
            .unwrap();
        assert!(matches!(result, StartChargeResult::OneTimeOrder { .. }));
    }

    #[tokio::test]
    async fn used_trial_is_refused_before_any_gateway_call() {
        let fx = Fixture::new();
        let mut record = fx.active_record("u1", PlanType::Trial);
        record.trial_used = true;
        fx.seed(record).await;

        for recurring in [None, Some(true), Some(false)] {
            let err = fx
                .start_charge_handler()
                .handle(command(PlanType::Trial, recurring))
                .await
                .unwrap_err();
            assert_eq!(err, BillingError::TrialAlreadyUsed);
        }
        assert!(fx.gateway.calls().is_empty());
        assert!(fx.pending.is_empty().await);
    }

    #[tokio::test]
    async fn trial_disabled_tenant_has_no_trial_plan() {
        let mut tenant = sample_tenant(TENANT);
        tenant.trial_enabled = false;
        tenant.catalog = crate::domain::tenant::PlanCatalog::new(
            &tenant.tenant_id,
            tenant.catalog.plans().into_iter().cloned().collect(),
            false,
        )
        .unwrap();
        let fx = Fixture::with_tenants(vec![tenant]);

        let err = fx
            .start_charge_handler()
            .handle(command(PlanType::Trial, None))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PlanNotFound(_)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure paths
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn gateway_failure_leaves_no_pending_charge() {
        let fx = Fixture::new();
        fx.gateway
            .fail_next(GatewayError::unavailable(3, &GatewayError::timeout("slow")));

        let err = fx
            .start_charge_handler()
            .handle(command(PlanType::Monthly, Some(false)))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::GatewayUnavailable(_)));
        assert!(fx.pending.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_tenant_is_rejected() {
        let fx = Fixture::new();
        let mut cmd = command(PlanType::Monthly, None);
        cmd.tenant_id = "com.unknown.app".to_string();

        let err = fx.start_charge_handler().handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::UnsupportedTenant(_)));
        assert!(fx.gateway.calls().is_empty());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn same_nonce_reuses_the_gateway_charge() {
        let fx = Fixture::new();
        let mut cmd = command(PlanType::Monthly, Some(false));
        cmd.idempotency_nonce = Some("client-nonce".to_string());

        let first = fx.start_charge_handler().handle(cmd.clone()).await.unwrap();
        let second = fx.start_charge_handler().handle(cmd).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fx.pending.len().await, 1);

        let calls = fx.gateway.calls();
        assert_eq!(calls[0].idempotency_key, calls[1].idempotency_key);
    }

    #[tokio::test]
    async fn fresh_nonce_per_request_when_absent() {
        let fx = Fixture::new();
        let first = fx
            .start_charge_handler()
            .handle(command(PlanType::Monthly, Some(false)))
            .await
            .unwrap();
        let second = fx
            .start_charge_handler()
            .handle(command(PlanType::Monthly, Some(false)))
            .await
            .unwrap();

        assert_ne!(first.external_id(), second.external_id());
        assert_eq!(fx.pending.len().await, 2);
    }

    #[test]
    fn charge_kind_rules() {
        let tenant = sample_tenant(TENANT);
        assert_eq!(charge_kind(&tenant, PlanType::Monthly, None), ChargeKind::Recurring);
        assert_eq!(
            charge_kind(&tenant, PlanType::Monthly, Some(false)),
            ChargeKind::OneTime
        );
        assert_eq!(
            charge_kind(&tenant, PlanType::Trial, Some(false)),
            ChargeKind::Recurring
        );
    }
}
