//! HTTP-level tests through the full router and middleware stack.

mod common;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use subscription_hub::adapters::http::{app_router, UserClaims, PACKAGE_HEADER};
use subscription_hub::config::RequestLimits;

fn app(h: &Harness) -> Router {
    app_router(h.state(), RequestLimits::default())
}

fn token(user_id: &str, secret: &str) -> String {
    let claims = UserClaims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn get(uri: &str, tenant: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header(PACKAGE_HEADER, tenant);
    if let Some(t) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", t));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, tenant: &str, bearer: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(PACKAGE_HEADER, tenant)
        .header("authorization", format!("Bearer {}", bearer))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_webhook(tenant: &str, signature: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/gateway")
        .header(PACKAGE_HEADER, tenant)
        .header("x-razorpay-signature", signature)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(read_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn missing_package_header_is_unsupported_tenant() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(Request::get("/subscriptions/plans").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNSUPPORTED_TENANT");
}

#[tokio::test]
async fn user_endpoints_require_bearer_token() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(get("/subscriptions/status", TENANT, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["code"], "AUTHENTICATION_REQUIRED");
}

#[tokio::test]
async fn token_from_another_tenant_is_rejected() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(get(
            "/subscriptions/status",
            TENANT,
            Some(&token("u1", OTHER_JWT_SECRET)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_is_null_for_new_user() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(get(
            "/subscriptions/status",
            TENANT,
            Some(&token("u1", JWT_SECRET)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["subscription"].is_null());
}

#[tokio::test]
async fn plans_follow_tenant_catalog() {
    let h = Harness::new();

    let response = app(&h)
        .oneshot(get("/subscriptions/plans", OTHER_TENANT, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["trialEnabled"], false);
    let plans: Vec<&str> = body["plans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["plan"].as_str().unwrap())
        .collect();
    assert!(plans.contains(&"monthly"));
    assert!(plans.contains(&"yearly"));
    assert!(!plans.contains(&"trial"));

    let response = app(&h)
        .oneshot(get("/subscriptions/plans", TENANT, None))
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body["trialEnabled"], true);
}

#[tokio::test]
async fn one_time_order_then_verify_activates() {
    let h = Harness::new();
    let bearer = token("u1", JWT_SECRET);

    let response = app(&h)
        .oneshot(post_json(
            "/subscriptions/create-order",
            TENANT,
            &bearer,
            json!({ "plan": "monthly", "recurring": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let order = read_json(response).await;
    assert_eq!(order["type"], "one-time-order");
    assert_eq!(order["amount"], 11700);
    assert_eq!(order["keyId"], "rzp_test_meditate");
    assert!(order.get("subscriptionId").is_none());
    let order_id = order["orderId"].as_str().unwrap().to_string();

    let response = app(&h)
        .oneshot(post_json(
            "/subscriptions/verify-payment",
            TENANT,
            &bearer,
            json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": payment_signature(&order_id, "pay_1"),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verified = read_json(response).await;
    assert_eq!(verified["success"], true);
    assert_eq!(verified["alreadyApplied"], false);
    assert_eq!(verified["subscription"]["plan"], "monthly");
    assert_eq!(verified["subscription"]["status"], "active");
    assert_eq!(verified["subscription"]["hasAccess"], true);
}

#[tokio::test]
async fn verify_with_bad_signature_is_rejected() {
    let h = Harness::new();
    let bearer = token("u1", JWT_SECRET);

    let response = app(&h)
        .oneshot(post_json(
            "/subscriptions/create-order",
            TENANT,
            &bearer,
            json!({ "plan": "yearly", "recurring": false }),
        ))
        .await
        .unwrap();
    let order_id = read_json(response).await["orderId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app(&h)
        .oneshot(post_json(
            "/subscriptions/verify-payment",
            TENANT,
            &bearer,
            json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": "deadbeef",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "INVALID_SIGNATURE");
}

#[tokio::test]
async fn unknown_plan_is_plan_not_found() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(post_json(
            "/subscriptions/create-order",
            TENANT,
            &token("u1", JWT_SECRET),
            json!({ "plan": "weekly" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "PLAN_NOT_FOUND");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = Harness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/subscriptions/create-order")
        .header(PACKAGE_HEADER, TENANT)
        .header("authorization", format!("Bearer {}", token("u1", JWT_SECRET)))
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(&h).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn trial_eligibility_reports_trial_plan() {
    let h = Harness::new();
    let response = app(&h)
        .oneshot(get(
            "/subscriptions/trial-eligibility",
            TENANT,
            Some(&token("u1", JWT_SECRET)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["eligible"], true);
    assert_eq!(body["trialPlan"]["plan"], "trial");
    assert_eq!(body["trialPlan"]["amount"], 100);
}

#[tokio::test]
async fn webhook_is_acknowledged_once_then_deduplicated() {
    let h = Harness::new();
    let body = webhook_body("evt_9", "subscription.pending", "sub_unknown", "pay_9");
    // Unknown event types are acknowledged without touching records
    let body_ignored = webhook_body("evt_10", "invoice.paid", "sub_unknown", "pay_9");

    let response = app(&h)
        .oneshot(post_webhook(TENANT, &webhook_signature(&body_ignored), body_ignored.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["message"], "ignored");

    let response = app(&h)
        .oneshot(post_webhook(TENANT, &webhook_signature(&body_ignored), body_ignored))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["message"], "already processed");

    let response = app(&h)
        .oneshot(post_webhook(TENANT, "not-a-signature", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "INVALID_SIGNATURE");
}
