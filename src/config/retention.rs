//! Retention sweep configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::PurgeStaleRecordsCommand;

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Processed webhook events older than this are deleted
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: i64,

    /// Unverified pending charges older than this are deleted
    #[serde(default = "default_pending_charge_ttl_hours")]
    pub pending_charge_ttl_hours: i64,

    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl RetentionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn purge_command(&self) -> PurgeStaleRecordsCommand {
        PurgeStaleRecordsCommand {
            webhook_retention_days: self.webhook_retention_days,
            pending_charge_ttl_hours: self.pending_charge_ttl_hours,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.webhook_retention_days <= 0
            || self.pending_charge_ttl_hours <= 0
            || self.sweep_interval_secs == 0
        {
            return Err(ValidationError::InvalidRetention);
        }
        Ok(())
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            webhook_retention_days: default_webhook_retention_days(),
            pending_charge_ttl_hours: default_pending_charge_ttl_hours(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_webhook_retention_days() -> i64 {
    30
}

fn default_pending_charge_ttl_hours() -> i64 {
    24
}

fn default_sweep_interval() -> u64 {
    3600
}
