//! In-memory PendingChargeRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::PendingCharge;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::tenant::TenantId;
use crate::ports::PendingChargeRepository;

#[derive(Debug, Default, Clone)]
pub struct InMemoryPendingChargeRepository {
    charges: Arc<RwLock<HashMap<(TenantId, String), PendingCharge>>>,
}

impl InMemoryPendingChargeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.charges.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.charges.read().await.is_empty()
    }
}

#[async_trait]
impl PendingChargeRepository for InMemoryPendingChargeRepository {
    async fn save(&self, charge: &PendingCharge) -> Result<(), DomainError> {
        let mut charges = self.charges.write().await;
        let key = (charge.tenant_id.clone(), charge.external_id.clone());
        if charges.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Pending charge {} already recorded",
                charge.external_id
            )));
        }
        charges.insert(key, charge.clone());
        Ok(())
    }

    async fn find(
        &self,
        tenant_id: &TenantId,
        external_id: &str,
    ) -> Result<Option<PendingCharge>, DomainError> {
        let charges = self.charges.read().await;
        Ok(charges
            .get(&(tenant_id.clone(), external_id.to_string()))
            .cloned())
    }

    async fn consume(&self, tenant_id: &TenantId, external_id: &str) -> Result<bool, DomainError> {
        let mut charges = self.charges.write().await;
        Ok(charges
            .remove(&(tenant_id.clone(), external_id.to_string()))
            .is_some())
    }

    async fn delete_created_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut charges = self.charges.write().await;
        let before = charges.len();
        charges.retain(|_, c| !c.created_at.is_before(&cutoff));
        Ok((before - charges.len()) as u64)
    }
}
