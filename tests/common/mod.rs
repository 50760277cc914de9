//! Shared harness for integration tests: a two-tenant catalog parsed from
//! YAML, in-memory stores, and the mock gateway.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::{json, Value};

use subscription_hub::adapters::http::SubscriptionAppState;
use subscription_hub::adapters::{
    InMemoryPendingChargeRepository, InMemorySubscriptionLedger, InMemoryWebhookEventRepository,
    MockPaymentGateway,
};
use subscription_hub::application::KeyedLocks;
use subscription_hub::config::TenantsFile;
use subscription_hub::domain::billing::{EventTypeMap, SignatureVerifier};
use subscription_hub::domain::tenant::TenantDirectory;

pub const TENANT: &str = "com.example.meditate";
pub const OTHER_TENANT: &str = "com.example.journal";

pub const KEY_SECRET: &str = "meditate-key-secret";
pub const WEBHOOK_SECRET: &str = "meditate-webhook-secret";
pub const JWT_SECRET: &str = "meditate-jwt-secret";
pub const OTHER_JWT_SECRET: &str = "journal-jwt-secret";

pub const CATALOG: &str = r#"
tenants:
  - tenant_id: com.example.meditate
    display_name: Meditate
    jwt_secret: meditate-jwt-secret
    callback_url: https://meditate.example.com/payment/callback
    gateway_base_url: https://gateway.example.com/v1
    key_id: rzp_test_meditate
    key_secret: meditate-key-secret
    webhook_secret: meditate-webhook-secret
    trial_enabled: true
    trial_subscriptions: true
    plans:
      monthly: { external_plan_id: plan_med_m, duration_days: 30, amount_minor_units: 11700, currency: INR }
      yearly: { external_plan_id: plan_med_y, duration_days: 365, amount_minor_units: 99900, currency: INR }
      trial: { external_plan_id: plan_med_t, duration_days: 7, amount_minor_units: 100, currency: INR }
  - tenant_id: com.example.journal
    display_name: Journal
    jwt_secret: journal-jwt-secret
    callback_url: https://journal.example.com/payment/callback
    gateway_base_url: https://gateway.example.com/v1
    key_id: rzp_test_journal
    key_secret: journal-key-secret
    webhook_secret: journal-webhook-secret
    trial_enabled: false
    plans:
      monthly: { external_plan_id: plan_jrn_m, duration_days: 30, amount_minor_units: 14900, currency: INR }
      yearly: { external_plan_id: plan_jrn_y, duration_days: 365, amount_minor_units: 129900, currency: INR }
"#;

pub fn directory() -> TenantDirectory {
    TenantsFile::from_yaml_str(CATALOG)
        .expect("catalog parses")
        .into_directory()
        .expect("catalog is valid")
}

pub fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string())
}

/// Client-side checkout signature for `id|payment_id`.
pub fn payment_signature(id: &str, payment_id: &str) -> String {
    SignatureVerifier::sign_pair(id, payment_id, &secret(KEY_SECRET))
}

/// Gateway-side webhook signature over the raw body.
pub fn webhook_signature(body: &[u8]) -> String {
    SignatureVerifier::sign(body, &secret(WEBHOOK_SECRET))
}

pub fn webhook_body(event_id: &str, event_type: &str, subscription_id: &str, payment_id: &str) -> Vec<u8> {
    let body: Value = json!({
        "id": event_id,
        "event": event_type,
        "payload": {
            "subscription": {"entity": {"id": subscription_id, "status": "active"}},
            "payment": {"entity": {"id": payment_id, "subscription_id": subscription_id}}
        }
    });
    serde_json::to_vec(&body).expect("json encodes")
}

pub struct Harness {
    pub directory: TenantDirectory,
    pub ledger: Arc<InMemorySubscriptionLedger>,
    pub pending: Arc<InMemoryPendingChargeRepository>,
    pub events: Arc<InMemoryWebhookEventRepository>,
    pub gateway: Arc<MockPaymentGateway>,
    pub locks: Arc<KeyedLocks<subscription_hub::application::SubscriptionKey>>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            directory: directory(),
            ledger: Arc::new(InMemorySubscriptionLedger::new()),
            pending: Arc::new(InMemoryPendingChargeRepository::new()),
            events: Arc::new(InMemoryWebhookEventRepository::new()),
            gateway: Arc::new(MockPaymentGateway::new()),
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn state(&self) -> SubscriptionAppState {
        SubscriptionAppState {
            directory: self.directory.clone(),
            gateway: self.gateway.clone(),
            ledger: self.ledger.clone(),
            pending_charges: self.pending.clone(),
            webhook_events: self.events.clone(),
            locks: self.locks.clone(),
            event_types: EventTypeMap::default(),
        }
    }
}
