//! # vigil-service
//!
//! The service shell: lifecycle controller, health endpoint, and the
//! binary entrypoint wiring them to settings and signals.

#![deny(unsafe_code)]

pub mod errors;
pub mod health;
pub mod lifecycle;

pub use errors::ServiceError;
pub use health::HealthState;
pub use lifecycle::Service;
