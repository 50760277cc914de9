//! Shared fixture for handler tests: in-memory stores, mock gateway, one tenant.

use std::sync::Arc;

use super::*;
use crate::adapters::gateway::MockPaymentGateway;
use crate::adapters::in_memory::{
    InMemoryPendingChargeRepository, InMemorySubscriptionLedger, InMemoryWebhookEventRepository,
};
use crate::application::keyed_lock::{KeyedLocks, SubscriptionKey};
use crate::domain::billing::{ChargeKind, EventTypeMap, SignatureVerifier, SubscriptionRecord};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::tenant::test_support::sample_tenant;
use crate::domain::tenant::{PlanDefinition, PlanType, TenantConfig, TenantDirectory};
use crate::ports::SubscriptionLedger;

pub const TENANT: &str = "com.example.app";

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub struct Fixture {
    pub directory: TenantDirectory,
    pub ledger: Arc<InMemorySubscriptionLedger>,
    pub pending: Arc<InMemoryPendingChargeRepository>,
    pub events: Arc<InMemoryWebhookEventRepository>,
    pub gateway: Arc<MockPaymentGateway>,
    pub locks: Arc<KeyedLocks<SubscriptionKey>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_tenants(vec![sample_tenant(TENANT)])
    }

    pub fn with_tenants(tenants: Vec<TenantConfig>) -> Self {
        Self {
            directory: TenantDirectory::new(tenants).unwrap(),
            ledger: Arc::new(InMemorySubscriptionLedger::new()),
            pending: Arc::new(InMemoryPendingChargeRepository::new()),
            events: Arc::new(InMemoryWebhookEventRepository::new()),
            gateway: Arc::new(MockPaymentGateway::new()),
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn tenant(&self) -> Arc<TenantConfig> {
        self.directory.resolve(TENANT).unwrap()
    }

    pub fn plan(&self, plan_type: PlanType) -> PlanDefinition {
        self.directory.resolve_plan(TENANT, plan_type).unwrap()
    }

    /// A current record bought through subscription `sub_seed` with payment `pay_seed`.
    pub fn active_record(&self, user_id: &str, plan_type: PlanType) -> SubscriptionRecord {
        SubscriptionRecord::activated(
            self.tenant().tenant_id.clone(),
            user(user_id),
            &self.plan(plan_type),
            ChargeKind::Recurring,
            "sub_seed",
            "pay_seed",
            Timestamp::now(),
        )
    }

    pub async fn seed(&self, record: SubscriptionRecord) -> SubscriptionRecord {
        self.ledger.insert(&record).await.unwrap()
    }

    pub async fn record(&self, user_id: &str) -> Option<SubscriptionRecord> {
        self.ledger
            .find(&self.tenant().tenant_id, &user(user_id))
            .await
            .unwrap()
    }

    /// Starts a charge and returns the gateway id.
    pub async fn start(&self, user_id: &str, plan_type: PlanType, recurring: bool) -> String {
        self.start_charge_handler()
            .handle(StartChargeCommand {
                tenant_id: TENANT.to_string(),
                user_id: user(user_id),
                plan_type,
                recurring: Some(recurring),
                idempotency_nonce: None,
            })
            .await
            .unwrap()
            .external_id()
            .to_string()
    }

    pub fn sign_payment(&self, external_id: &str, payment_id: &str) -> String {
        SignatureVerifier::sign_pair(
            external_id,
            payment_id,
            &self.tenant().credentials.key_secret,
        )
    }

    pub fn sign_webhook(&self, body: &[u8]) -> String {
        SignatureVerifier::sign(body, &self.tenant().credentials.webhook_secret)
    }

    pub fn start_charge_handler(&self) -> StartChargeHandler {
        StartChargeHandler::new(
            self.directory.clone(),
            self.gateway.clone(),
            self.ledger.clone(),
            self.pending.clone(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.directory.clone(),
            self.ledger.clone(),
            self.pending.clone(),
            self.locks.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        self.webhook_handler_with(EventTypeMap::default())
    }

    pub fn webhook_handler_with(&self, event_types: EventTypeMap) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            self.directory.clone(),
            self.ledger.clone(),
            self.pending.clone(),
            self.events.clone(),
            self.locks.clone(),
            event_types,
        )
    }

    pub fn get_status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(
            self.directory.clone(),
            self.ledger.clone(),
            self.locks.clone(),
        )
    }

    pub fn trial_eligibility_handler(&self) -> CheckTrialEligibilityHandler {
        CheckTrialEligibilityHandler::new(self.directory.clone(), self.ledger.clone())
    }

    pub fn sync_handler(&self) -> SyncSubscriptionHandler {
        SyncSubscriptionHandler::new(
            self.directory.clone(),
            self.gateway.clone(),
            self.ledger.clone(),
            self.locks.clone(),
        )
    }

    pub fn purge_handler(&self) -> PurgeStaleRecordsHandler {
        PurgeStaleRecordsHandler::new(self.events.clone(), self.pending.clone())
    }
}
