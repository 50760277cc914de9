//! Mock payment gateway for tests and local development.
//!
//! Supports:
//! - Deterministic ids (`order_1`, `sub_1`, ...)
//! - Receipt de-duplication: the same idempotency key returns the same charge
//! - Error injection, consumed in FIFO order by any call
//! - Call tracking
//! - Settable subscription status for `fetch_subscription`

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::tenant::TenantConfig;
use crate::ports::{ChargeRequest, GatewayError, GatewayOrder, GatewaySubscription, PaymentGateway};

/// Recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCall {
    pub method: &'static str,
    pub tenant_id: String,
    pub idempotency_key: Option<String>,
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    orders_by_key: HashMap<String, GatewayOrder>,
    subscriptions_by_key: HashMap<String, GatewaySubscription>,
    subscriptions: HashMap<String, GatewaySubscription>,
    failures: VecDeque<GatewayError>,
    calls: Vec<GatewayCall>,
}

#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not cascade into every later call.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue an error for the next call to any method.
    pub fn fail_next(&self, error: GatewayError) {
        self.state().failures.push_back(error);
    }

    /// Override the status reported for a subscription.
    pub fn set_subscription_status(&self, subscription_id: &str, status: &str) {
        let mut state = self.state();
        let entry = state
            .subscriptions
            .entry(subscription_id.to_string())
            .or_insert_with(|| GatewaySubscription {
                external_subscription_id: subscription_id.to_string(),
                customer_id: None,
                status: String::new(),
            });
        entry.status = status.to_string();
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    /// Number of calls to one method, including failed ones.
    pub fn attempts(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|c| c.method == method).count()
    }

    fn begin(
        &self,
        method: &'static str,
        tenant: &TenantConfig,
        key: Option<&str>,
    ) -> Result<MutexGuard<'_, MockState>, GatewayError> {
        let mut state = self.state();
        state.calls.push(GatewayCall {
            method,
            tenant_id: tenant.tenant_id.to_string(),
            idempotency_key: key.map(str::to_string),
        });
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let key = request.idempotency_key.as_str();
        let mut state = self.begin("create_order", tenant, Some(key))?;

        if let Some(existing) = state.orders_by_key.get(key) {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let order = GatewayOrder {
            external_order_id: format!("order_{}", state.next_id),
            amount_minor_units: request.plan.amount_minor_units,
            currency: request.plan.currency.clone(),
        };
        state.orders_by_key.insert(key.to_string(), order.clone());
        Ok(order)
    }

    async fn create_subscription(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        let key = request.idempotency_key.as_str();
        let mut state = self.begin("create_subscription", tenant, Some(key))?;

        if let Some(existing) = state.subscriptions_by_key.get(key) {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let subscription = GatewaySubscription {
            external_subscription_id: format!("sub_{}", state.next_id),
            customer_id: Some(format!("cust_{}", request.user_id)),
            status: "created".to_string(),
        };
        state
            .subscriptions_by_key
            .insert(key.to_string(), subscription.clone());
        state.subscriptions.insert(
            subscription.external_subscription_id.clone(),
            subscription.clone(),
        );
        Ok(subscription)
    }

    async fn fetch_subscription(
        &self,
        tenant: &TenantConfig,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        let state = self.begin("fetch_subscription", tenant, None)?;
        state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("subscription"))
    }
}
