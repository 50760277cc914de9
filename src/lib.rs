//! Subscription Hub - Multi-tenant payment and subscription reconciliation.
//!
//! Fronts an external payment gateway for several client applications
//! ("packages"), keeping each tenant's plans, secrets, and subscription
//! records isolated while sharing one code path.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
