//! Axum router configuration for subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_order, get_plans, get_status, get_trial_eligibility, handle_gateway_webhook,
    sync_subscription, verify_payment, SubscriptionAppState,
};

/// Create the subscription API router.
///
/// # Routes
///
/// ## User Endpoints (package header + bearer token)
/// - `POST /create-order` - Create an order or recurring subscription
/// - `POST /verify-payment` - Verify a completed checkout
/// - `POST /sync` - Refresh status from the gateway
/// - `GET /status` - Current user's subscription
/// - `GET /trial-eligibility` - Whether a trial is still available
///
/// ## Tenant Endpoints (package header only)
/// - `GET /plans` - Plans offered by the tenant
pub fn subscription_routes() -> Router<SubscriptionAppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify-payment", post(verify_payment))
        .route("/sync", post(sync_subscription))
        .route("/status", get(get_status))
        .route("/trial-eligibility", get(get_trial_eligibility))
        .route("/plans", get(get_plans))
}

/// Create the gateway webhook router.
///
/// Separate from the user routes because webhooks carry no bearer token;
/// they are authenticated by body signature only.
pub fn webhook_routes() -> Router<SubscriptionAppState> {
    Router::new().route("/gateway", post(handle_gateway_webhook))
}

/// Create the complete subscription module router.
pub fn subscription_router() -> Router<SubscriptionAppState> {
    Router::new()
        .nest("/subscriptions", subscription_routes())
        .nest("/webhooks", webhook_routes())
}
