//! Per-tenant payment configuration.

use secrecy::{ExposeSecret, SecretString};

use super::{PlanCatalog, TenantId};
use crate::domain::foundation::ValidationError;

/// Gateway credentials for one tenant.
#[derive(Clone)]
pub struct GatewayCredentials {
    /// Public key id, handed to clients so they can open checkout.
    pub key_id: String,
    /// Secret used for gateway basic auth and payment signatures.
    pub key_secret: SecretString,
    /// Secret the gateway signs webhook bodies with.
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Resolved configuration of one tenant. Immutable after startup.
#[derive(Debug, Clone)]
pub struct TenantConfig {
    pub tenant_id: TenantId,
    pub display_name: String,
    /// HS256 secret for the tenant's user bearer tokens.
    pub jwt_secret: SecretString,
    pub callback_url: String,
    pub gateway_base_url: String,
    pub credentials: GatewayCredentials,
    pub trial_enabled: bool,
    /// When true, trials are sold as recurring subscriptions; otherwise as
    /// one-time orders.
    pub trial_subscriptions: bool,
    pub catalog: PlanCatalog,
}

impl TenantConfig {
    /// Checks secrets and URLs. Plans are validated by `PlanCatalog::new`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let secrets = [
            ("jwt_secret", &self.jwt_secret),
            ("key_secret", &self.credentials.key_secret),
            ("webhook_secret", &self.credentials.webhook_secret),
        ];
        for (field, secret) in secrets {
            if secret.expose_secret().is_empty() {
                return Err(ValidationError::empty_field(field));
            }
        }
        if self.credentials.key_id.trim().is_empty() {
            return Err(ValidationError::empty_field("key_id"));
        }
        for (field, url) in [
            ("callback_url", &self.callback_url),
            ("gateway_base_url", &self.gateway_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::invalid_format(
                    field,
                    "must start with http:// or https://",
                ));
            }
        }
        Ok(())
    }

    /// Whether a trial purchase should create a recurring subscription.
    pub fn trial_is_recurring(&self) -> bool {
        self.trial_subscriptions
    }
}
