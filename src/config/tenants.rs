//! Tenant catalog loading
//!
//! The catalog is a YAML document listing every supported package with its
//! secrets, URLs, and plans. It is parsed once at startup and frozen into a
//! [`TenantDirectory`].
//!
//! ```yaml
//! tenants:
//!   - tenant_id: com.example.app
//!     display_name: Example
//!     jwt_secret: ...
//!     callback_url: https://app.example.com/payment/callback
//!     gateway_base_url: https://api.razorpay.com/v1
//!     key_id: rzp_live_xxx
//!     key_secret: ...
//!     webhook_secret: ...
//!     trial_enabled: true
//!     trial_subscriptions: true
//!     plans:
//!       monthly: { external_plan_id: plan_m, duration_days: 30, amount_minor_units: 11700, currency: INR }
//!       yearly:  { external_plan_id: plan_y, duration_days: 365, amount_minor_units: 99900, currency: INR }
//!       trial:   { external_plan_id: plan_t, duration_days: 7, amount_minor_units: 100, currency: INR }
//! ```

use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

use super::error::{ConfigError, ValidationError};
use crate::domain::tenant::{
    GatewayCredentials, PlanCatalog, PlanDefinition, PlanType, TenantConfig, TenantDirectory,
    TenantId, DEFAULT_TOTAL_COUNT,
};

/// Where the catalog lives.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantsConfig {
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

fn default_path() -> String {
    "config/tenants.yaml".to_string()
}

/// Raw catalog document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantsFile {
    pub tenants: Vec<TenantEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantEntry {
    pub tenant_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub jwt_secret: String,
    pub callback_url: String,
    pub gateway_base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    #[serde(default)]
    pub trial_enabled: bool,
    #[serde(default = "default_trial_subscriptions")]
    pub trial_subscriptions: bool,
    pub plans: PlansEntry,
}

fn default_trial_subscriptions() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlansEntry {
    #[serde(default)]
    pub monthly: Option<PlanEntry>,
    #[serde(default)]
    pub yearly: Option<PlanEntry>,
    #[serde(default)]
    pub trial: Option<PlanEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanEntry {
    pub external_plan_id: String,
    pub duration_days: u32,
    pub amount_minor_units: u64,
    pub currency: String,
    #[serde(default = "default_total_count")]
    pub total_count: u32,
}

fn default_total_count() -> u32 {
    DEFAULT_TOTAL_COUNT
}

impl TenantsFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::TenantFileRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Validates every entry and builds the immutable directory.
    pub fn into_directory(self) -> Result<TenantDirectory, ValidationError> {
        if self.tenants.is_empty() {
            return Err(ValidationError::InvalidTenantCatalog(
                "at least one tenant is required".to_string(),
            ));
        }
        let tenants = self
            .tenants
            .into_iter()
            .map(TenantEntry::into_config)
            .collect::<Result<Vec<_>, _>>()?;
        TenantDirectory::new(tenants).map_err(catalog_error)
    }
}

impl TenantEntry {
    fn into_config(self) -> Result<TenantConfig, ValidationError> {
        let tenant_id = TenantId::new(self.tenant_id).map_err(catalog_error)?;

        let mut plans = Vec::new();
        for (plan_type, entry) in [
            (PlanType::Monthly, self.plans.monthly),
            (PlanType::Yearly, self.plans.yearly),
            (PlanType::Trial, self.plans.trial),
        ] {
            if let Some(entry) = entry {
                let plan = PlanDefinition::new(
                    tenant_id.clone(),
                    plan_type,
                    entry.external_plan_id,
                    entry.duration_days,
                    entry.amount_minor_units,
                    entry.currency,
                    entry.total_count,
                )
                .map_err(|e| {
                    ValidationError::InvalidTenantCatalog(format!(
                        "{} {} plan: {}",
                        tenant_id, plan_type, e
                    ))
                })?;
                plans.push(plan);
            }
        }
        let catalog = PlanCatalog::new(&tenant_id, plans, self.trial_enabled).map_err(|e| {
            ValidationError::InvalidTenantCatalog(format!("{}: {}", tenant_id, e))
        })?;

        Ok(TenantConfig {
            display_name: self
                .display_name
                .unwrap_or_else(|| tenant_id.to_string()),
            tenant_id,
            jwt_secret: SecretString::new(self.jwt_secret),
            callback_url: self.callback_url,
            gateway_base_url: self.gateway_base_url,
            credentials: GatewayCredentials {
                key_id: self.key_id,
                key_secret: SecretString::new(self.key_secret),
                webhook_secret: SecretString::new(self.webhook_secret),
            },
            trial_enabled: self.trial_enabled,
            trial_subscriptions: self.trial_subscriptions,
            catalog,
        })
    }
}

fn catalog_error(err: crate::domain::foundation::ValidationError) -> ValidationError {
    ValidationError::InvalidTenantCatalog(err.to_string())
}
