//! Webhook dedup ledger entry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::foundation::Timestamp;
use crate::domain::tenant::TenantId;

/// Record of one inbound webhook delivery, persisted before it is applied.
///
/// `(tenant_id, external_event_id)` is unique. `processed` flips to true
/// only after the ledger mutation for the event has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    pub tenant_id: TenantId,
    pub external_event_id: String,
    pub event_type: String,
    /// Hex SHA-256 of the raw request body.
    pub payload_hash: String,
    pub received_at: Timestamp,
    pub processed: bool,
    pub processed_at: Option<Timestamp>,
}

impl WebhookEventRecord {
    /// New, unprocessed delivery.
    pub fn received(
        tenant_id: TenantId,
        external_event_id: impl Into<String>,
        event_type: impl Into<String>,
        raw_body: &[u8],
        now: Timestamp,
    ) -> Self {
        Self {
            tenant_id,
            external_event_id: external_event_id.into(),
            event_type: event_type.into(),
            payload_hash: payload_hash(raw_body),
            received_at: now,
            processed: false,
            processed_at: None,
        }
    }
}

/// Hex SHA-256 of a raw payload.
pub fn payload_hash(raw_body: &[u8]) -> String {
    hex::encode(Sha256::digest(raw_body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_event_starts_unprocessed() {
        let event = WebhookEventRecord::received(
            TenantId::new("com.example.app").unwrap(),
            "evt_1",
            "subscription.charged",
            b"{}",
            Timestamp::now(),
        );
        assert!(!event.processed);
        assert!(event.processed_at.is_none());
        assert_eq!(event.payload_hash.len(), 64);
    }

    #[test]
    fn payload_hash_is_sensitive_to_whitespace() {
        assert_ne!(payload_hash(b"{\"a\":1}"), payload_hash(b"{\"a\": 1}"));
    }
}
