//! In-memory WebhookEventRepository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::WebhookEventRecord;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::tenant::TenantId;
use crate::ports::{SaveResult, WebhookEventRepository};

#[derive(Debug, Default, Clone)]
pub struct InMemoryWebhookEventRepository {
    records: Arc<RwLock<HashMap<(TenantId, String), WebhookEventRecord>>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find(
        &self,
        tenant_id: &TenantId,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let records = self.records.read().await;
        Ok(records
            .get(&(tenant_id.clone(), external_event_id.to_string()))
            .cloned())
    }

    async fn record_received(&self, record: &WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().await;
        let key = (record.tenant_id.clone(), record.external_event_id.clone());
        if records.contains_key(&key) {
            Ok(SaveResult::AlreadyExists)
        } else {
            records.insert(key, record.clone());
            Ok(SaveResult::Inserted)
        }
    }

    async fn mark_processed(
        &self,
        tenant_id: &TenantId,
        external_event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&(tenant_id.clone(), external_event_id.to_string()))
            .ok_or_else(|| DomainError::new(ErrorCode::NotFound, "Webhook event not found"))?;
        record.processed = true;
        record.processed_at = Some(processed_at);
        Ok(())
    }

    async fn delete_processed_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !(r.processed && r.received_at.is_before(&cutoff)));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, received_at: Timestamp) -> WebhookEventRecord {
        WebhookEventRecord::received(
            TenantId::new("com.example.app").unwrap(),
            id,
            "subscription.charged",
            id.as_bytes(),
            received_at,
        )
    }

    #[tokio::test]
    async fn duplicate_delivery_reports_already_exists() {
        let repo = InMemoryWebhookEventRepository::new();
        let e = event("evt_1", Timestamp::now());
        assert_eq!(repo.record_received(&e).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.record_received(&e).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn same_event_id_is_independent_per_tenant() {
        let repo = InMemoryWebhookEventRepository::new();
        let a = event("evt_1", Timestamp::now());
        let mut b = a.clone();
        b.tenant_id = TenantId::new("com.other.app").unwrap();

        assert_eq!(repo.record_received(&a).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.record_received(&b).await.unwrap(), SaveResult::Inserted);
    }

    #[tokio::test]
    async fn mark_processed_sets_flag() {
        let repo = InMemoryWebhookEventRepository::new();
        let e = event("evt_1", Timestamp::now());
        repo.record_received(&e).await.unwrap();
        repo.mark_processed(&e.tenant_id, "evt_1", Timestamp::now())
            .await
            .unwrap();

        let stored = repo.find(&e.tenant_id, "evt_1").await.unwrap().unwrap();
        assert!(stored.processed);
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn purge_keeps_unprocessed_events() {
        let repo = InMemoryWebhookEventRepository::new();
        let now = Timestamp::now();
        let old_done = event("evt_old_done", now.minus_days(40));
        let old_pending = event("evt_old_pending", now.minus_days(40));
        repo.record_received(&old_done).await.unwrap();
        repo.record_received(&old_pending).await.unwrap();
        repo.mark_processed(&old_done.tenant_id, "evt_old_done", now)
            .await
            .unwrap();

        let deleted = repo.delete_processed_before(now.minus_days(30)).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(repo
            .find(&old_pending.tenant_id, "evt_old_pending")
            .await
            .unwrap()
            .is_some());
    }
}
