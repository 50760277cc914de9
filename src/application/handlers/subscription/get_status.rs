//! GetSubscriptionStatusHandler - Query handler for the caller's subscription.
//!
//! A record whose period has ended is moved to `Expired` on read. The write is
//! conditional; if another writer got there first the fresh record is returned.

use std::sync::Arc;

use crate::application::keyed_lock::{KeyedLocks, SubscriptionKey};
use crate::domain::billing::{BillingError, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::tenant::TenantDirectory;
use crate::ports::SubscriptionLedger;

#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub tenant_id: String,
    pub user_id: UserId,
}

pub struct GetSubscriptionStatusHandler {
    directory: TenantDirectory,
    ledger: Arc<dyn SubscriptionLedger>,
    locks: Arc<KeyedLocks<SubscriptionKey>>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(
        directory: TenantDirectory,
        ledger: Arc<dyn SubscriptionLedger>,
        locks: Arc<KeyedLocks<SubscriptionKey>>,
    ) -> Self {
        Self {
            directory,
            ledger,
            locks,
        }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<Option<SubscriptionRecord>, BillingError> {
        let tenant = self.directory.resolve(&query.tenant_id)?;
        let tenant_id = &tenant.tenant_id;

        let record = match self.ledger.find(tenant_id, &query.user_id).await? {
            Some(record) => record,
            None => return Ok(None),
        };
        let now = Timestamp::now();
        if record.status == SubscriptionStatus::Expired || !record.end_date.is_before(&now) {
            return Ok(Some(record));
        }

        let _guard = self
            .locks
            .lock((tenant_id.clone(), query.user_id.clone()))
            .await;
        let mut record = match self.ledger.find(tenant_id, &query.user_id).await? {
            Some(record) => record,
            None => return Ok(None),
        };
        if !record.expire_if_lapsed(now) {
            return Ok(Some(record));
        }

        match self.ledger.update(&record).await {
            Ok(saved) => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    user_id = %query.user_id,
                    "Subscription expired"
                );
                Ok(Some(saved))
            }
            Err(err) if err.is_conflict() => {
                Ok(self.ledger.find(tenant_id, &query.user_id).await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::subscription::test_support::{user, Fixture, TENANT};
    use crate::domain::tenant::PlanType;

    fn query(user_id: &str) -> GetSubscriptionStatusQuery {
        GetSubscriptionStatusQuery {
            tenant_id: TENANT.to_string(),
            user_id: user(user_id),
        }
    }

    #[tokio::test]
    async fn no_record_is_none() {
        let fx = Fixture::new();
        let status = fx.get_status_handler().handle(query("u1")).await.unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn current_record_is_returned_unchanged() {
        let fx = Fixture::new();
        let seeded = fx.seed(fx.active_record("u1", PlanType::Monthly)).await;

        let status = fx.get_status_handler().handle(query("u1")).await.unwrap();
        assert_eq!(status, Some(seeded));
    }

    #[tokio::test]
    async fn lapsed_record_is_expired_on_read() {
        let fx = Fixture::new();
        let mut record = fx.active_record("u1", PlanType::Monthly);
        record.start_date = Timestamp::now().minus_days(40);
        record.end_date = Timestamp::now().minus_days(10);
        fx.seed(record).await;

        let status = fx
            .get_status_handler()
            .handle(query("u1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(status.status, SubscriptionStatus::Expired);
        assert!(!status.has_access(Timestamp::now()));
        assert_eq!(fx.record("u1").await.unwrap().status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn expired_record_is_not_rewritten() {
        let fx = Fixture::new();
        let mut record = fx.active_record("u1", PlanType::Monthly);
        record.status = SubscriptionStatus::Expired;
        record.start_date = Timestamp::now().minus_days(40);
        record.end_date = Timestamp::now().minus_days(10);
        let seeded = fx.seed(record).await;

        let status = fx.get_status_handler().handle(query("u1")).await.unwrap();
        assert_eq!(status.unwrap().version, seeded.version);
    }
}
