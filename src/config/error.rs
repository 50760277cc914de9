//! Errors raised while loading settings and the tenant catalog.

use thiserror::Error;

/// Startup failures. Any of these aborts the process before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Failed to read tenant catalog {path}: {source}")]
    TenantFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse tenant catalog: {0}")]
    TenantFileParse(#[from] serde_yaml::Error),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A setting is present but out of range or inconsistent with another.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Request body limit must be between 1 byte and 1 MiB")]
    InvalidBodyLimit,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Gateway max_attempts must be between 1 and 10")]
    InvalidRetryBound,

    #[error("Gateway timeout must be between 1 and 120 seconds")]
    InvalidGatewayTimeout,

    #[error("Mock gateway is not allowed in production")]
    MockGatewayInProduction,

    #[error("Retention windows must be positive")]
    InvalidRetention,

    #[error("Invalid tenant catalog: {0}")]
    InvalidTenantCatalog(String),
}
