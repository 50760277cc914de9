//! PostgreSQL implementation of SubscriptionLedger.
//!
//! Conditional writes map to SQL: inserts rely on the `(tenant_id, user_id)`
//! primary key and updates carry `WHERE version = $n`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::tenant::{PlanType, TenantId};
use crate::ports::SubscriptionLedger;

const PRIMARY_KEY: &str = "subscription_records_pkey";

pub struct PostgresSubscriptionLedger {
    pool: PgPool,
}

impl PostgresSubscriptionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription record.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    tenant_id: String,
    user_id: String,
    plan_type: String,
    status: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    external_subscription_id: Option<String>,
    last_payment_external_id: Option<String>,
    trial_used: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            tenant_id: TenantId::new(row.tenant_id).map_err(corrupt)?,
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            plan_type: row.plan_type.parse::<PlanType>().map_err(corrupt)?,
            status: row.status.parse::<SubscriptionStatus>().map_err(corrupt)?,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            external_subscription_id: row.external_subscription_id,
            last_payment_external_id: row.last_payment_external_id,
            trial_used: row.trial_used,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid subscription row: {}", err),
    )
}

const SELECT_COLUMNS: &str = r#"
    SELECT tenant_id, user_id, plan_type, status, start_date, end_date,
           external_subscription_id, last_payment_external_id, trial_used,
           version, created_at, updated_at
    FROM subscription_records
"#;

#[async_trait]
impl SubscriptionLedger for PostgresSubscriptionLedger {
    async fn find(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let query = format!("{} WHERE tenant_id = $1 AND user_id = $2", SELECT_COLUMNS);
        let row: Option<SubscriptionRow> = sqlx::query_as(&query)
            .bind(tenant_id.as_str())
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_external_subscription_id(
        &self,
        tenant_id: &TenantId,
        external_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let query = format!(
            "{} WHERE tenant_id = $1 AND external_subscription_id = $2",
            SELECT_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&query)
            .bind(tenant_id.as_str())
            .bind(external_subscription_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find subscription: {}", e)))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn insert(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_records (
                tenant_id, user_id, plan_type, status, start_date, end_date,
                external_subscription_id, last_payment_external_id, trial_used,
                version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1, $10, $11)
            "#,
        )
        .bind(record.tenant_id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.plan_type.as_str())
        .bind(record.status.as_str())
        .bind(record.start_date.as_datetime())
        .bind(record.end_date.as_datetime())
        .bind(&record.external_subscription_id)
        .bind(&record.last_payment_external_id)
        .bind(record.trial_used)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(PRIMARY_KEY) {
                    return DomainError::conflict("Subscription record already exists");
                }
            }
            DomainError::database(format!("Failed to insert subscription: {}", e))
        })?;

        let mut stored = record.clone();
        stored.version = 1;
        Ok(stored)
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<SubscriptionRecord, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_records SET
                plan_type = $3,
                status = $4,
                start_date = $5,
                end_date = $6,
                external_subscription_id = $7,
                last_payment_external_id = $8,
                trial_used = trial_used OR $9,
                updated_at = $10,
                version = version + 1
            WHERE tenant_id = $1 AND user_id = $2 AND version = $11
            "#,
        )
        .bind(record.tenant_id.as_str())
        .bind(record.user_id.as_str())
        .bind(record.plan_type.as_str())
        .bind(record.status.as_str())
        .bind(record.start_date.as_datetime())
        .bind(record.end_date.as_datetime())
        .bind(&record.external_subscription_id)
        .bind(&record.last_payment_external_id)
        .bind(record.trial_used)
        .bind(record.updated_at.as_datetime())
        .bind(record.version)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::conflict(format!(
                "Subscription record for user {} changed since version {}",
                record.user_id, record.version
            )));
        }

        let mut stored = record.clone();
        stored.version = record.version + 1;
        Ok(stored)
    }
}
