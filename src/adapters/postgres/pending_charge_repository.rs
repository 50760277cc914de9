//! PostgreSQL implementation of PendingChargeRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{ChargeKind, IdempotencyKey, PendingCharge};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::tenant::{PlanType, TenantId};
use crate::ports::PendingChargeRepository;

const PRIMARY_KEY: &str = "pending_charges_pkey";

pub struct PostgresPendingChargeRepository {
    pool: PgPool,
}

impl PostgresPendingChargeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingChargeRow {
    tenant_id: String,
    external_id: String,
    user_id: String,
    plan_type: String,
    amount_minor_units: i64,
    currency: String,
    kind: String,
    idempotency_key: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PendingChargeRow> for PendingCharge {
    type Error = DomainError;

    fn try_from(row: PendingChargeRow) -> Result<Self, Self::Error> {
        Ok(PendingCharge {
            external_id: row.external_id,
            tenant_id: TenantId::new(row.tenant_id).map_err(corrupt)?,
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            plan_type: row.plan_type.parse::<PlanType>().map_err(corrupt)?,
            amount_minor_units: u64::try_from(row.amount_minor_units).map_err(corrupt)?,
            currency: row.currency,
            kind: row.kind.parse::<ChargeKind>().map_err(corrupt)?,
            idempotency_key: IdempotencyKey::from_stored(row.idempotency_key),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn corrupt(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid pending charge row: {}", err),
    )
}

#[async_trait]
impl PendingChargeRepository for PostgresPendingChargeRepository {
    async fn save(&self, charge: &PendingCharge) -> Result<(), DomainError> {
        let amount = i64::try_from(charge.amount_minor_units).map_err(|_| {
            DomainError::new(ErrorCode::ValidationFailed, "Charge amount out of range")
        })?;

        sqlx::query(
            r#"
            INSERT INTO pending_charges (
                tenant_id, external_id, user_id, plan_type, amount_minor_units,
                currency, kind, idempotency_key, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(charge.tenant_id.as_str())
        .bind(&charge.external_id)
        .bind(charge.user_id.as_str())
        .bind(charge.plan_type.as_str())
        .bind(amount)
        .bind(&charge.currency)
        .bind(charge.kind.as_str())
        .bind(charge.idempotency_key.as_str())
        .bind(charge.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(PRIMARY_KEY) {
                    return DomainError::conflict(format!(
                        "Pending charge {} already recorded",
                        charge.external_id
                    ));
                }
            }
            DomainError::database(format!("Failed to save pending charge: {}", e))
        })?;

        Ok(())
    }

    async fn find(
        &self,
        tenant_id: &TenantId,
        external_id: &str,
    ) -> Result<Option<PendingCharge>, DomainError> {
        let row: Option<PendingChargeRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, external_id, user_id, plan_type, amount_minor_units,
                   currency, kind, idempotency_key, created_at
            FROM pending_charges
            WHERE tenant_id = $1 AND external_id = $2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find pending charge: {}", e)))?;

        row.map(PendingCharge::try_from).transpose()
    }

    async fn consume(&self, tenant_id: &TenantId, external_id: &str) -> Result<bool, DomainError> {
        let result =
            sqlx::query("DELETE FROM pending_charges WHERE tenant_id = $1 AND external_id = $2")
                .bind(tenant_id.as_str())
                .bind(external_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to consume pending charge: {}", e))
                })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_created_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM pending_charges WHERE created_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to purge pending charges: {}", e))
            })?;

        Ok(result.rows_affected())
    }
}
