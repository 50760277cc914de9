//! In-memory SubscriptionLedger.
//!
//! Same conditional-write semantics as the PostgreSQL adapter: a version
//! mismatch is a `Conflict`, never a silent overwrite.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::tenant::TenantId;
use crate::ports::SubscriptionLedger;

type Key = (TenantId, UserId);

#[derive(Debug, Default, Clone)]
pub struct InMemorySubscriptionLedger {
    records: Arc<RwLock<HashMap<Key, SubscriptionRecord>>>,
}

impl InMemorySubscriptionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriptionLedger for InMemorySubscriptionLedger {
    async fn find(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(&(tenant_id.clone(), user_id.clone())).cloned())
    }

    async fn find_by_external_subscription_id(
        &self,
        tenant_id: &TenantId,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| {
                &r.tenant_id == tenant_id
                    && r.external_subscription_id.as_deref() == Some(external_subscription_id)
            })
            .cloned())
    }

    async fn insert(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let key = (record.tenant_id.clone(), record.user_id.clone());
        if records.contains_key(&key) {
            return Err(DomainError::conflict(format!(
                "Subscription record already exists for user {} in {}",
                record.user_id, record.tenant_id
            )));
        }
        let mut stored = record.clone();
        stored.version = 1;
        records.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord, DomainError> {
        let mut records = self.records.write().await;
        let key = (record.tenant_id.clone(), record.user_id.clone());
        let current = records.get_mut(&key).ok_or_else(|| {
            DomainError::new(ErrorCode::NotFound, "Subscription record not found")
        })?;
        if current.version != record.version {
            return Err(DomainError::conflict(format!(
                "Stale subscription record: expected version {}, found {}",
                record.version, current.version
            )));
        }
        let mut stored = record.clone();
        stored.version = record.version + 1;
        // Once used, the trial flag is never cleared
        stored.trial_used |= current.trial_used;
        *current = stored.clone();
        Ok(stored)
    }
}
