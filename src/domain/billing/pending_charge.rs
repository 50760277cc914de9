//! Pending charges and idempotency keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};
use crate::domain::tenant::{PlanType, TenantId};

/// Length of the hex digest kept in a derived key. With the prefix this
/// stays under the gateway's 40-character receipt limit.
const KEY_DIGEST_HEX_LEN: usize = 32;

/// Receipt / idempotency key forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derives a stable key from the logical request.
    ///
    /// The same (user, plan, nonce) always yields the same key, so a client
    /// retrying with the same nonce reuses the gateway-side receipt.
    pub fn derive(user_id: &UserId, plan_type: PlanType, nonce: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(plan_type.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(nonce.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(format!("rcpt_{}", &digest[..KEY_DIGEST_HEX_LEN]))
    }

    /// Wraps a key read back from storage.
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the gateway will collect the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    OneTime,
    Recurring,
}

impl ChargeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeKind::OneTime => "one_time",
            ChargeKind::Recurring => "recurring",
        }
    }
}

impl FromStr for ChargeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" => Ok(ChargeKind::OneTime),
            "recurring" => Ok(ChargeKind::Recurring),
            other => Err(ValidationError::invalid_format(
                "kind",
                format!("unknown charge kind '{}'", other),
            )),
        }
    }
}

/// An order or subscription created at the gateway but not yet paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCharge {
    /// Gateway order id or subscription id, depending on `kind`.
    pub external_id: String,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub plan_type: PlanType,
    pub amount_minor_units: u64,
    pub currency: String,
    pub kind: ChargeKind,
    pub idempotency_key: IdempotencyKey,
    pub created_at: Timestamp,
}

impl PendingCharge {
    /// True if this charge was created for the given user in the given tenant.
    pub fn belongs_to(&self, tenant_id: &TenantId, user_id: &UserId) -> bool {
        &self.tenant_id == tenant_id && &self.user_id == user_id
    }
}
