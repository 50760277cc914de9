//! Request and response bodies of the gateway's REST API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct CreateOrderBody<'a> {
    pub amount: u64,
    pub currency: &'a str,
    /// Idempotency key. The gateway de-duplicates orders by receipt.
    pub receipt: &'a str,
    pub notes: BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSubscriptionBody<'a> {
    pub plan_id: &'a str,
    pub total_count: u32,
    pub customer_notify: u8,
    pub notes: BTreeMap<&'static str, String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// `{"error": {"code": "...", "description": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
