//! # vigil-core
//!
//! Shared leaf types for the vigil EventSub monitoring service:
//!
//! - [`backoff`]: bounded exponential backoff for reconnect attempts
//! - [`status`]: the process-wide observable service status

#![deny(unsafe_code)]

pub mod backoff;
pub mod status;

pub use backoff::BackoffPolicy;
pub use status::{ServiceStatus, StatusCell};
