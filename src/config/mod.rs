//! Process settings and tenant catalog loading.
//!
//! Process settings are loaded from environment variables using the `config`
//! and `dotenvy` crates, with the `SUBSCRIPTION_HUB` prefix and `__` between
//! nested keys. Tenant data (secrets, URLs, plans) lives in a separate YAML
//! catalog referenced by `tenants.path`.
//!
//! # Example
//!
//! ```no_run
//! use subscription_hub::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! let tenants = config.load_tenants().expect("Invalid tenant catalog");
//! ```

mod database;
mod error;
mod gateway;
mod retention;
mod server;
mod tenants;

pub use database::{DatabaseConfig, StorageBackend};
pub use error::{ConfigError, ValidationError};
pub use gateway::GatewayConfig;
pub use retention::RetentionConfig;
pub use server::{Environment, RequestLimits, ServerConfig};
pub use tenants::{PlanEntry, PlansEntry, TenantEntry, TenantsConfig, TenantsFile};

use serde::Deserialize;

use crate::domain::tenant::TenantDirectory;

/// All process settings, one field per `SUBSCRIPTION_HUB__<SECTION>__` prefix.
///
/// Every section has defaults, so an empty environment yields a runnable
/// development setup backed by the in-memory store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub tenants: TenantsConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and then the process environment.
    ///
    /// `SUBSCRIPTION_HUB__GATEWAY__MAX_ATTEMPTS=5` sets `gateway.max_attempts`.
    /// Values already in the environment win over `.env`.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal outside development
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_HUB")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks each section, then the rules that span sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.gateway.validate()?;
        self.retention.validate()?;
        if self.gateway.mock && self.is_production() {
            return Err(ValidationError::MockGatewayInProduction);
        }
        if self.tenants.path.trim().is_empty() {
            return Err(ValidationError::MissingRequired("tenants.path"));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    /// Reads and validates the tenant catalog.
    pub fn load_tenants(&self) -> Result<TenantDirectory, ConfigError> {
        let directory = TenantsFile::from_path(&self.tenants.path)?.into_directory()?;
        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "SUBSCRIPTION_HUB__DATABASE__URL",
        "SUBSCRIPTION_HUB__SERVER__PORT",
        "SUBSCRIPTION_HUB__SERVER__ENVIRONMENT",
        "SUBSCRIPTION_HUB__GATEWAY__MOCK",
        "SUBSCRIPTION_HUB__GATEWAY__MAX_ATTEMPTS",
        "SUBSCRIPTION_HUB__TENANTS__PATH",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.database.backend(), StorageBackend::InMemory);
        assert_eq!(config.tenants.path, "config/tenants.yaml");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[
            ("SUBSCRIPTION_HUB__DATABASE__URL", "postgresql://test@localhost/test"),
            ("SUBSCRIPTION_HUB__SERVER__PORT", "3000"),
            ("SUBSCRIPTION_HUB__GATEWAY__MAX_ATTEMPTS", "5"),
            ("SUBSCRIPTION_HUB__TENANTS__PATH", "/etc/hub/tenants.yaml"),
        ])
        .unwrap();

        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.gateway.max_attempts, 5);
        assert_eq!(config.tenants.path, "/etc/hub/tenants.yaml");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_production() {
        let config = load_with(&[("SUBSCRIPTION_HUB__SERVER__ENVIRONMENT", "production")]).unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_mock_gateway_rejected_in_production() {
        let config = load_with(&[
            ("SUBSCRIPTION_HUB__SERVER__ENVIRONMENT", "production"),
            ("SUBSCRIPTION_HUB__GATEWAY__MOCK", "true"),
        ])
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MockGatewayInProduction)
        ));
    }

    #[test]
    fn test_load_tenants_reports_missing_file() {
        let config = AppConfig {
            tenants: TenantsConfig {
                path: "/nonexistent/tenants.yaml".to_string(),
            },
            ..Default::default()
        };

        assert!(matches!(
            config.load_tenants(),
            Err(ConfigError::TenantFileRead { .. })
        ));
    }
}
