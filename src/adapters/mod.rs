//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `gateway` - Payment gateway REST client, retry decorator, and mock
//! - `postgres` - PostgreSQL repositories (sqlx)
//! - `in_memory` - Map-backed repositories for development and tests
//! - `http` - Axum routes, extractors, and error mapping

pub mod gateway;
pub mod http;
pub mod in_memory;
pub mod postgres;

pub use gateway::{HttpPaymentGateway, MockPaymentGateway, RetryPolicy, RetryingGateway};
pub use in_memory::{
    InMemoryPendingChargeRepository, InMemorySubscriptionLedger, InMemoryWebhookEventRepository,
};
pub use postgres::{
    PostgresPendingChargeRepository, PostgresSubscriptionLedger, PostgresWebhookEventRepository,
};
