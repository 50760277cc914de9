//! HTTP adapters - REST API implementations.
//!
//! `app_router` assembles the subscription routes with the shared middleware
//! stack: request ids, tracing, the request timeout and body size limit.

pub mod error;
pub mod extractors;
pub mod subscription;

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::RequestLimits;

pub use error::{ApiError, ErrorResponse};
pub use extractors::{AuthenticatedUser, TenantContext, UserClaims, PACKAGE_HEADER};
pub use subscription::{subscription_router, SubscriptionAppState};

/// Builds the service router with middleware applied.
pub fn app_router(state: SubscriptionAppState, limits: RequestLimits) -> Router {
    subscription_router()
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.timeout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
