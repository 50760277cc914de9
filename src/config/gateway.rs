//! Payment gateway configuration
//!
//! Credentials are per tenant and live in the tenant catalog; this section
//! only carries transport and retry settings shared by all tenants.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::gateway::RetryPolicy;
use crate::domain::billing::{EventAction, EventTypeMap};

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Extra webhook event names, layered over the defaults
    #[serde(default)]
    pub event_types: HashMap<String, EventAction>,

    /// Use the in-process mock gateway (development only)
    #[serde(default)]
    pub mock: bool,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }

    pub fn event_type_map(&self) -> EventTypeMap {
        EventTypeMap::with_overrides(&self.event_types)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ValidationError::InvalidRetryBound);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            event_types: HashMap::new(),
            mock: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = GatewayConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRetryBound)
        ));
    }

    #[test]
    fn test_event_overrides_extend_defaults() {
        let mut event_types = HashMap::new();
        event_types.insert("subscription.halted".to_string(), EventAction::Failed);
        let config = GatewayConfig {
            event_types,
            ..Default::default()
        };

        let map = config.event_type_map();
        assert_eq!(map.action_for("subscription.halted"), EventAction::Failed);
        assert_eq!(map.action_for("subscription.charged"), EventAction::Charged);
    }
}
