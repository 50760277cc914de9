//! SubscriptionLedger port - Authoritative store of subscription records.
//!
//! One record per (tenant, user). Writes are conditional so that horizontally
//! scaled processes cannot overwrite each other:
//!
//! - `insert` fails with `ErrorCode::Conflict` if a record already exists
//! - `update` succeeds only if the stored `version` equals `record.version`,
//!   and fails with `ErrorCode::Conflict` otherwise

use async_trait::async_trait;

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::{DomainError, UserId};
use crate::domain::tenant::TenantId;

#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Find the record for a user in a tenant.
    async fn find(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Find the record holding a gateway subscription id.
    async fn find_by_external_subscription_id(
        &self,
        tenant_id: &TenantId,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Insert a new record. Returns the stored record (version 1).
    async fn insert(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord, DomainError>;

    /// Conditionally replace a record. Returns the stored record with its
    /// version incremented.
    async fn update(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord, DomainError>;
}
