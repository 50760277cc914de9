//! PendingChargeRepository port - Charges awaiting payment verification.

use async_trait::async_trait;

use crate::domain::billing::PendingCharge;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::tenant::TenantId;

/// Port for short-lived pending charges.
///
/// `(tenant_id, external_id)` is unique. A charge is consumed once its
/// payment has been applied to the ledger.
#[async_trait]
pub trait PendingChargeRepository: Send + Sync {
    /// Persist a new pending charge. Fails with `Conflict` if the external id
    /// is already recorded for the tenant.
    async fn save(&self, charge: &PendingCharge) -> Result<(), DomainError>;

    /// Find a pending charge by its gateway id.
    async fn find(
        &self,
        tenant_id: &TenantId,
        external_id: &str,
    ) -> Result<Option<PendingCharge>, DomainError>;

    /// Remove a charge. Returns false if it was already gone.
    async fn consume(&self, tenant_id: &TenantId, external_id: &str) -> Result<bool, DomainError>;

    /// Delete charges created before `cutoff`. Returns the number deleted.
    async fn delete_created_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
