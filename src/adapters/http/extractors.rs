//! Request extractors for the tenant boundary and user authentication.
//!
//! - `TenantContext` resolves `X-Package-Name` against the tenant directory
//! - `AuthenticatedUser` additionally requires a Bearer JWT signed with the
//!   tenant's HS256 secret; the `sub` claim is the user id
//!
//! Both fail before any handler logic runs.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::domain::billing::BillingError;
use crate::domain::foundation::UserId;
use crate::domain::tenant::{TenantConfig, TenantDirectory};

/// Header carrying the tenant (package) id.
pub const PACKAGE_HEADER: &str = "x-package-name";

/// Claims expected in a user bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub exp: usize,
}

/// Resolved tenant for the current request.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Arc<TenantConfig>);

impl TenantContext {
    pub fn tenant_id(&self) -> String {
        self.0.tenant_id.to_string()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    TenantDirectory: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let directory = TenantDirectory::from_ref(state);
        let raw = package_header(parts).ok_or_else(|| {
            BillingError::UnsupportedTenant("missing package header".to_string())
        })?;
        let tenant = directory.resolve(raw).map_err(BillingError::from)?;
        Ok(TenantContext(tenant))
    }
}

/// Authenticated user within a resolved tenant.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub tenant: Arc<TenantConfig>,
    pub user_id: UserId,
}

impl AuthenticatedUser {
    pub fn tenant_id(&self) -> String {
        self.tenant.tenant_id.to_string()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    TenantDirectory: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TenantContext(tenant) = TenantContext::from_request_parts(parts, state).await?;

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authentication is required"))?;

        let user_id = verify_token(&tenant, token)?;
        Ok(AuthenticatedUser { tenant, user_id })
    }
}

fn package_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(PACKAGE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn verify_token(tenant: &TenantConfig, token: &str) -> Result<UserId, ApiError> {
    let key = DecodingKey::from_secret(tenant.jwt_secret.expose_secret().as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<UserClaims>(token, &key, &validation).map_err(|e| {
        tracing::debug!(tenant_id = %tenant.tenant_id, error = %e, "Bearer token rejected");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    UserId::new(data.claims.sub).map_err(|_| ApiError::unauthorized("Invalid or expired token"))
}
