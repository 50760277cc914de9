//! PostgreSQL implementation of WebhookEventRepository.
//!
//! Concurrent deliveries of the same event race on the
//! `(tenant_id, external_event_id)` primary key; the loser sees
//! `SaveResult::AlreadyExists`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::WebhookEventRecord;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::tenant::TenantId;
use crate::ports::{SaveResult, WebhookEventRepository};

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    tenant_id: String,
    external_event_id: String,
    event_type: String,
    payload_hash: String,
    received_at: DateTime<Utc>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<WebhookEventRow> for WebhookEventRecord {
    type Error = DomainError;

    fn try_from(row: WebhookEventRow) -> Result<Self, Self::Error> {
        let tenant_id = TenantId::new(row.tenant_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid tenant_id: {}", e))
        })?;
        Ok(WebhookEventRecord {
            tenant_id,
            external_event_id: row.external_event_id,
            event_type: row.event_type,
            payload_hash: row.payload_hash,
            received_at: Timestamp::from_datetime(row.received_at),
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find(
        &self,
        tenant_id: &TenantId,
        external_event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, external_event_id, event_type, payload_hash,
                   received_at, processed, processed_at
            FROM webhook_events
            WHERE tenant_id = $1 AND external_event_id = $2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(external_event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find webhook event: {}", e)))?;

        row.map(WebhookEventRecord::try_from).transpose()
    }

    async fn record_received(&self, record: &WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                tenant_id, external_event_id, event_type, payload_hash,
                received_at, processed, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, external_event_id) DO NOTHING
            "#,
        )
        .bind(record.tenant_id.as_str())
        .bind(&record.external_event_id)
        .bind(&record.event_type)
        .bind(&record.payload_hash)
        .bind(record.received_at.as_datetime())
        .bind(record.processed)
        .bind(record.processed_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record webhook event: {}", e)))?;

        if result.rows_affected() == 0 {
            Ok(SaveResult::AlreadyExists)
        } else {
            Ok(SaveResult::Inserted)
        }
    }

    async fn mark_processed(
        &self,
        tenant_id: &TenantId,
        external_event_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_events SET processed = TRUE, processed_at = $3
            WHERE tenant_id = $1 AND external_event_id = $2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(external_event_id)
        .bind(processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to mark webhook event processed: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotFound,
                "Webhook event not found",
            ));
        }

        Ok(())
    }

    async fn delete_processed_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result =
            sqlx::query("DELETE FROM webhook_events WHERE processed AND received_at < $1")
                .bind(cutoff.as_datetime())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to purge webhook events: {}", e))
                })?;

        Ok(result.rows_affected())
    }
}
