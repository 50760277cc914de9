//! HTTP DTOs for subscription endpoints.
//!
//! Request bodies keep the gateway checkout field names (`razorpay_*`) that
//! client SDKs already emit; responses use camelCase.

use serde::{Deserialize, Serialize};

use crate::application::handlers::{
    PaymentReference, PlansView, StartChargeResult, SyncSubscriptionResult, TrialEligibility,
    VerifyPaymentResult,
};
use crate::domain::billing::{BillingError, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::Timestamp;
use crate::domain::tenant::{PlanDefinition, PlanType, TenantConfig};
use crate::ports::WebhookResult;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /subscriptions/create-order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub plan: String,
    /// Defaults to a recurring subscription. Ignored for trials.
    #[serde(default)]
    pub recurring: Option<bool>,
    /// Client nonce; retries with the same value reuse the same receipt.
    #[serde(default, alias = "idempotency_key")]
    pub idempotency_key: Option<String>,
}

impl CreateOrderRequest {
    pub fn plan_type(&self) -> Result<PlanType, BillingError> {
        parse_plan(&self.plan)
    }
}

/// Body of `POST /subscriptions/verify-payment`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_subscription_id: Option<String>,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    #[serde(default)]
    pub plan: Option<String>,
}

impl VerifyPaymentRequest {
    /// Exactly one of order id and subscription id must be present.
    pub fn reference(&self) -> Result<PaymentReference, BillingError> {
        let order = non_empty(&self.razorpay_order_id);
        let subscription = non_empty(&self.razorpay_subscription_id);
        match (order, subscription) {
            (Some(id), None) => Ok(PaymentReference::Order(id.to_string())),
            (None, Some(id)) => Ok(PaymentReference::Subscription(id.to_string())),
            _ => Err(BillingError::Validation(
                "exactly one of razorpay_order_id and razorpay_subscription_id is required"
                    .to_string(),
            )),
        }
    }

    pub fn plan_type(&self) -> Result<Option<PlanType>, BillingError> {
        non_empty(&self.plan).map(parse_plan).transpose()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_plan(raw: &str) -> Result<PlanType, BillingError> {
    raw.parse()
        .map_err(|_| BillingError::PlanNotFound(raw.trim().to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Response of `POST /subscriptions/create-order`.
///
/// The `type` tag decides which id the client opens checkout with; an order
/// response never carries a subscription id and vice versa.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    #[serde(flatten)]
    pub charge: ChargeResponse,
    pub key_id: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChargeResponse {
    OneTimeOrder(OrderResponse),
    RecurringSubscription(RecurringResponse),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub plan: PlanType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringResponse {
    pub subscription_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub amount: u64,
    pub currency: String,
    pub plan: PlanType,
}

impl CreateOrderResponse {
    pub fn new(result: StartChargeResult, tenant: &TenantConfig) -> Self {
        let charge = match result {
            StartChargeResult::OneTimeOrder {
                order_id,
                amount_minor_units,
                currency,
                plan_type,
            } => ChargeResponse::OneTimeOrder(OrderResponse {
                order_id,
                amount: amount_minor_units,
                currency,
                plan: plan_type,
            }),
            StartChargeResult::RecurringSubscription {
                subscription_id,
                customer_id,
                amount_minor_units,
                currency,
                plan_type,
            } => ChargeResponse::RecurringSubscription(RecurringResponse {
                subscription_id,
                customer_id,
                amount: amount_minor_units,
                currency,
                plan: plan_type,
            }),
        };
        Self {
            success: true,
            charge,
            key_id: tenant.credentials.key_id.clone(),
            callback_url: tenant.callback_url.clone(),
        }
    }
}

/// Client view of a subscription record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub plan: PlanType,
    pub status: SubscriptionStatus,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub has_access: bool,
    pub days_remaining: i64,
    pub trial_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl SubscriptionView {
    pub fn at(record: &SubscriptionRecord, now: Timestamp) -> Self {
        Self {
            plan: record.plan_type,
            status: record.status,
            start_date: record.start_date,
            end_date: record.end_date,
            has_access: record.has_access(now),
            days_remaining: record.days_remaining(now),
            trial_used: record.trial_used,
            subscription_id: record.external_subscription_id.clone(),
        }
    }
}

impl From<&SubscriptionRecord> for SubscriptionView {
    fn from(record: &SubscriptionRecord) -> Self {
        Self::at(record, Timestamp::now())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub already_applied: bool,
    pub subscription: SubscriptionView,
}

impl From<VerifyPaymentResult> for VerifyPaymentResponse {
    fn from(result: VerifyPaymentResult) -> Self {
        let message = if result.already_applied {
            "Payment already verified"
        } else {
            "Payment verified"
        };
        Self {
            success: true,
            message: message.to_string(),
            already_applied: result.already_applied,
            subscription: SubscriptionView::from(&result.record),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    /// Null when the user never subscribed in this tenant.
    pub subscription: Option<SubscriptionView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub plan: PlanType,
    pub amount: u64,
    pub currency: String,
    pub duration_days: u32,
}

impl From<&PlanDefinition> for PlanView {
    fn from(plan: &PlanDefinition) -> Self {
        Self {
            plan: plan.plan_type,
            amount: plan.amount_minor_units,
            currency: plan.currency.clone(),
            duration_days: plan.duration_days,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<PlanView>,
    pub trial_enabled: bool,
}

impl From<PlansView> for PlansResponse {
    fn from(view: PlansView) -> Self {
        Self {
            success: true,
            plans: view.plans.iter().map(PlanView::from).collect(),
            trial_enabled: view.trial_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialEligibilityResponse {
    pub success: bool,
    pub eligible: bool,
    pub trial_plan: Option<PlanView>,
}

impl From<TrialEligibility> for TrialEligibilityResponse {
    fn from(eligibility: TrialEligibility) -> Self {
        Self {
            success: true,
            eligible: eligibility.eligible,
            trial_plan: eligibility.trial_plan.as_ref().map(PlanView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub gateway_status: String,
    pub changed: bool,
    pub subscription: SubscriptionView,
}

impl From<SyncSubscriptionResult> for SyncResponse {
    fn from(result: SyncSubscriptionResult) -> Self {
        Self {
            success: true,
            gateway_status: result.gateway_status,
            changed: result.changed,
            subscription: SubscriptionView::from(&result.record),
        }
    }
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub success: bool,
    pub message: String,
}

impl From<WebhookResult> for WebhookAckResponse {
    fn from(result: WebhookResult) -> Self {
        let message = match result {
            WebhookResult::Processed => "processed",
            WebhookResult::AlreadyProcessed => "already processed",
            WebhookResult::Ignored => "ignored",
        };
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}
