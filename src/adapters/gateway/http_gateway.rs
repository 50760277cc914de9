//! HTTP adapter for the payment gateway's REST API.
//!
//! Each call authenticates with the tenant's `key_id` / `key_secret` using
//! basic auth and targets the tenant's `gateway_base_url`. Retries are not
//! done here; wrap this adapter in `RetryingGateway`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::time::Duration;

use super::wire_types::{
    CreateOrderBody, CreateSubscriptionBody, ErrorEnvelope, OrderResponse, SubscriptionResponse,
};
use crate::domain::tenant::TenantConfig;
use crate::ports::{
    ChargeRequest, GatewayError, GatewayErrorCode, GatewayOrder, GatewaySubscription,
    PaymentGateway,
};

/// Header carrying the idempotency key on create calls.
pub const IDEMPOTENCY_HEADER: &str = "X-Idempotency-Key";

pub struct HttpPaymentGateway {
    client: Client,
    timeout: Duration,
}

impl HttpPaymentGateway {
    /// Builds a client with a hard per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }

    fn url(tenant: &TenantConfig, path: &str) -> String {
        format!("{}/{}", tenant.gateway_base_url.trim_end_matches('/'), path)
    }

    fn notes(tenant: &TenantConfig, request: &ChargeRequest) -> BTreeMap<&'static str, String> {
        let mut notes = BTreeMap::new();
        notes.insert("tenant_id", tenant.tenant_id.to_string());
        notes.insert("user_id", request.user_id.to_string());
        notes.insert("plan_type", request.plan.plan_type.to_string());
        notes.insert("idempotency_key", request.idempotency_key.to_string());
        notes
    }

    fn send_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::timeout(format!(
                "No response within {}s",
                self.timeout.as_secs()
            ))
        } else if err.is_connect() {
            GatewayError::network(format!("Connection failed: {}", err))
        } else {
            GatewayError::network(err.to_string())
        }
    }

    /// Maps non-2xx responses to gateway errors.
    async fn check_status(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (provider_code, description) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (
                envelope.error.code,
                envelope.error.description.unwrap_or_else(|| body.clone()),
            ),
            Err(_) => (None, body),
        };

        let code = classify_status(status);
        tracing::warn!(
            status = status.as_u16(),
            provider_code = provider_code.as_deref().unwrap_or(""),
            "Gateway request failed"
        );

        let err = GatewayError::new(code, format!("{}: {}", status, description));
        Err(match provider_code {
            Some(pc) => err.with_provider_code(pc),
            None => err,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response.json::<T>().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::InvalidResponse,
                format!("Failed to parse gateway response: {}", e),
            )
        })
    }
}

/// Status code → error code.
fn classify_status(status: StatusCode) -> GatewayErrorCode {
    match status.as_u16() {
        401 | 403 => GatewayErrorCode::AuthenticationError,
        404 => GatewayErrorCode::NotFound,
        408 => GatewayErrorCode::Timeout,
        429 => GatewayErrorCode::RateLimited,
        500..=599 => GatewayErrorCode::ServerError,
        _ => GatewayErrorCode::Rejected,
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        let body = CreateOrderBody {
            amount: request.plan.amount_minor_units,
            currency: &request.plan.currency,
            receipt: request.idempotency_key.as_str(),
            notes: Self::notes(tenant, request),
        };

        let response = self
            .client
            .post(Self::url(tenant, "orders"))
            .basic_auth(
                &tenant.credentials.key_id,
                Some(tenant.credentials.key_secret.expose_secret()),
            )
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let order: OrderResponse = Self::decode(Self::check_status(response).await?).await?;

        tracing::debug!(
            tenant_id = %tenant.tenant_id,
            order_id = %order.id,
            amount = order.amount,
            "Gateway order created"
        );

        Ok(GatewayOrder {
            external_order_id: order.id,
            amount_minor_units: order.amount,
            currency: order.currency,
        })
    }

    async fn create_subscription(
        &self,
        tenant: &TenantConfig,
        request: &ChargeRequest,
    ) -> Result<GatewaySubscription, GatewayError> {
        let body = CreateSubscriptionBody {
            plan_id: &request.plan.external_plan_id,
            total_count: request.plan.total_count,
            customer_notify: 1,
            notes: Self::notes(tenant, request),
        };

        let response = self
            .client
            .post(Self::url(tenant, "subscriptions"))
            .basic_auth(
                &tenant.credentials.key_id,
                Some(tenant.credentials.key_secret.expose_secret()),
            )
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let sub: SubscriptionResponse = Self::decode(Self::check_status(response).await?).await?;

        tracing::debug!(
            tenant_id = %tenant.tenant_id,
            subscription_id = %sub.id,
            "Gateway subscription created"
        );

        Ok(GatewaySubscription {
            external_subscription_id: sub.id,
            customer_id: sub.customer_id,
            status: sub.status.unwrap_or_else(|| "created".to_string()),
        })
    }

    async fn fetch_subscription(
        &self,
        tenant: &TenantConfig,
        subscription_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        let response = self
            .client
            .get(Self::url(tenant, &format!("subscriptions/{}", subscription_id)))
            .basic_auth(
                &tenant.credentials.key_id,
                Some(tenant.credentials.key_secret.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let sub: SubscriptionResponse = Self::decode(Self::check_status(response).await?).await?;

        Ok(GatewaySubscription {
            external_subscription_id: sub.id,
            customer_id: sub.customer_id,
            status: sub.status.unwrap_or_default(),
        })
    }
}
