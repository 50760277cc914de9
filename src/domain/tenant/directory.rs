//! Closed table of supported tenants.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::{PlanDefinition, PlanType, TenantConfig, TenantId};
use crate::domain::foundation::ValidationError;

/// Lookup failures. Both are client errors and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("Unsupported tenant: {0}")]
    UnsupportedTenant(String),

    #[error("Plan '{plan}' is not offered by tenant {tenant}")]
    PlanNotFound { tenant: String, plan: String },
}

/// Every tenant the process serves, validated and frozen at startup.
///
/// Cheap to clone; shared by all request handlers without locking.
#[derive(Debug, Clone, Default)]
pub struct TenantDirectory {
    tenants: Arc<HashMap<TenantId, Arc<TenantConfig>>>,
}

impl TenantDirectory {
    /// Validates each tenant and rejects duplicate ids.
    pub fn new(tenants: Vec<TenantConfig>) -> Result<Self, ValidationError> {
        let mut map = HashMap::with_capacity(tenants.len());
        for tenant in tenants {
            tenant.validate()?;
            let id = tenant.tenant_id.clone();
            if map.insert(id.clone(), Arc::new(tenant)).is_some() {
                return Err(ValidationError::invalid_format(
                    "tenants",
                    format!("duplicate tenant id {}", id),
                ));
            }
        }
        Ok(Self {
            tenants: Arc::new(map),
        })
    }

    /// Resolves a raw tenant identifier. Unknown or malformed ids fail closed.
    pub fn resolve(&self, tenant_id: &str) -> Result<Arc<TenantConfig>, TenantError> {
        TenantId::new(tenant_id.trim())
            .ok()
            .and_then(|id| self.tenants.get(&id).cloned())
            .ok_or_else(|| TenantError::UnsupportedTenant(tenant_id.to_string()))
    }

    /// Resolves the price and duration of a plan for a tenant.
    pub fn resolve_plan(
        &self,
        tenant_id: &str,
        plan_type: PlanType,
    ) -> Result<PlanDefinition, TenantError> {
        let tenant = self.resolve(tenant_id)?;
        tenant
            .catalog
            .get(plan_type)
            .cloned()
            .ok_or_else(|| TenantError::PlanNotFound {
                tenant: tenant_id.to_string(),
                plan: plan_type.to_string(),
            })
    }

    pub fn tenant_ids(&self) -> Vec<&TenantId> {
        let mut ids: Vec<_> = self.tenants.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
