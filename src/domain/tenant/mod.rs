//! Tenant module - Supported client applications and their plan catalogs.
//!
//! Each tenant (a "package") has isolated pricing, secrets, and callback
//! configuration. The directory is built once at startup and never mutated.

mod directory;
mod plan;
mod tenant_config;
mod tenant_id;

pub use directory::{TenantDirectory, TenantError};
pub use plan::{PlanCatalog, PlanDefinition, PlanType, DEFAULT_TOTAL_COUNT};
pub use tenant_config::{GatewayCredentials, TenantConfig};
pub use tenant_id::TenantId;

#[cfg(test)]
pub(crate) use tenant_config::test_support;
