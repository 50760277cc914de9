//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, time, state-machine support, and error types that
//! the tenant and billing modules are built from.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::UserId;
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
