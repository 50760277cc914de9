//! HTTP handlers for subscription endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, Json, State};
use axum::http::HeaderMap;

use crate::application::handlers::{
    CheckTrialEligibilityHandler, CheckTrialEligibilityQuery, GetPlansHandler, GetPlansQuery,
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, HandleGatewayWebhookCommand,
    HandleGatewayWebhookHandler, StartChargeCommand, StartChargeHandler, SyncSubscriptionCommand,
    SyncSubscriptionHandler, VerifyPaymentCommand, VerifyPaymentHandler,
};
use crate::application::keyed_lock::{KeyedLocks, SubscriptionKey};
use crate::domain::billing::EventTypeMap;
use crate::domain::tenant::TenantDirectory;
use crate::ports::{
    PaymentGateway, PendingChargeRepository, SubscriptionLedger, WebhookEventRepository,
};

use super::dto::{
    CreateOrderRequest, CreateOrderResponse, PlansResponse, StatusResponse, SubscriptionView,
    SyncResponse, TrialEligibilityResponse, VerifyPaymentRequest, VerifyPaymentResponse,
    WebhookAckResponse,
};
use crate::adapters::http::error::ApiError;
use crate::adapters::http::extractors::{AuthenticatedUser, TenantContext, PACKAGE_HEADER};

/// Header carrying the webhook body signature.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Header carrying the gateway's event id.
pub const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is behind an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct SubscriptionAppState {
    pub directory: TenantDirectory,
    pub gateway: Arc<dyn PaymentGateway>,
    pub ledger: Arc<dyn SubscriptionLedger>,
    pub pending_charges: Arc<dyn PendingChargeRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub locks: Arc<KeyedLocks<SubscriptionKey>>,
    pub event_types: EventTypeMap,
}

impl FromRef<SubscriptionAppState> for TenantDirectory {
    fn from_ref(state: &SubscriptionAppState) -> Self {
        state.directory.clone()
    }
}

impl SubscriptionAppState {
    /// Create handlers on demand from the shared state.
    pub fn start_charge_handler(&self) -> StartChargeHandler {
        StartChargeHandler::new(
            self.directory.clone(),
            self.gateway.clone(),
            self.ledger.clone(),
            self.pending_charges.clone(),
        )
    }

    pub fn verify_payment_handler(&self) -> VerifyPaymentHandler {
        VerifyPaymentHandler::new(
            self.directory.clone(),
            self.ledger.clone(),
            self.pending_charges.clone(),
            self.locks.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleGatewayWebhookHandler {
        HandleGatewayWebhookHandler::new(
            self.directory.clone(),
            self.ledger.clone(),
            self.pending_charges.clone(),
            self.webhook_events.clone(),
            self.locks.clone(),
            self.event_types.clone(),
        )
    }

    pub fn plans_handler(&self) -> GetPlansHandler {
        GetPlansHandler::new(self.directory.clone())
    }

    pub fn status_handler(&self) -> GetSubscriptionStatusHandler {
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
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscriptions/create-order - Create a gateway order or subscription
pub async fn create_order(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let Json(request) = payload?;
    let cmd = StartChargeCommand {
        tenant_id: user.tenant_id(),
        user_id: user.user_id.clone(),
        plan_type: request.plan_type()?,
        recurring: request.recurring,
        idempotency_nonce: request.idempotency_key,
    };

    let result = state.start_charge_handler().handle(cmd).await?;

    Ok(Json(CreateOrderResponse::new(result, &user.tenant)))
}

/// POST /subscriptions/verify-payment - Verify a client-reported payment
pub async fn verify_payment(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let Json(request) = payload?;
    let cmd = VerifyPaymentCommand {
        tenant_id: user.tenant_id(),
        user_id: user.user_id,
        reference: request.reference()?,
        payment_id: request.razorpay_payment_id.clone(),
        signature: request.razorpay_signature.clone(),
        plan_type: request.plan_type()?,
    };

    let result = state.verify_payment_handler().handle(cmd).await?;

    Ok(Json(VerifyPaymentResponse::from(result)))
}

/// POST /subscriptions/sync - Pull the gateway's view of the subscription
pub async fn sync_subscription(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<Json<SyncResponse>, ApiError> {
    let cmd = SyncSubscriptionCommand {
        tenant_id: user.tenant_id(),
        user_id: user.user_id,
    };

    let result = state.sync_handler().handle(cmd).await?;

    Ok(Json(SyncResponse::from(result)))
}

/// POST /webhooks/gateway - Handle gateway webhook deliveries
///
/// No user auth; the body must be verified against the tenant's webhook
/// secret byte for byte, so it is taken as raw `Bytes`.
pub async fn handle_gateway_webhook(
    State(state): State<SubscriptionAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAckResponse>, ApiError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let cmd = HandleGatewayWebhookCommand {
        tenant_id: header(PACKAGE_HEADER),
        signature: header(SIGNATURE_HEADER),
        event_id: header(EVENT_ID_HEADER),
        payload: body.to_vec(),
    };

    let result = state.webhook_handler().handle(cmd).await?;

    Ok(Json(WebhookAckResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /subscriptions/plans - Plans offered by the tenant
pub async fn get_plans(
    State(state): State<SubscriptionAppState>,
    tenant: TenantContext,
) -> Result<Json<PlansResponse>, ApiError> {
    let query = GetPlansQuery {
        tenant_id: tenant.tenant_id(),
    };

    let view = state.plans_handler().handle(query)?;

    Ok(Json(PlansResponse::from(view)))
}

/// GET /subscriptions/status - Current user's subscription
pub async fn get_status(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<Json<StatusResponse>, ApiError> {
    let query = GetSubscriptionStatusQuery {
        tenant_id: user.tenant_id(),
        user_id: user.user_id,
    };

    let record = state.status_handler().handle(query).await?;

    Ok(Json(StatusResponse {
        success: true,
        subscription: record.as_ref().map(SubscriptionView::from),
    }))
}

/// GET /subscriptions/trial-eligibility - Whether the user may start a trial
pub async fn get_trial_eligibility(
    State(state): State<SubscriptionAppState>,
    user: AuthenticatedUser,
) -> Result<Json<TrialEligibilityResponse>, ApiError> {
    let query = CheckTrialEligibilityQuery {
        tenant_id: user.tenant_id(),
        user_id: user.user_id,
    };

    let eligibility = state.trial_eligibility_handler().handle(query).await?;

    Ok(Json(TrialEligibilityResponse::from(eligibility)))
}
