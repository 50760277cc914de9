//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (ids, timestamps, errors, state machine)
//! - `tenant` - Supported tenants, their secrets, and plan catalogs
//! - `billing` - Subscription records, pending charges, signatures, and webhooks

pub mod billing;
pub mod foundation;
pub mod tenant;
