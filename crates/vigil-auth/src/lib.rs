//! # vigil-auth
//!
//! App access token management for the vigil service.
//!
//! The service authorizes subscription-creation and announcement calls with
//! a short-lived app access token obtained through the client-credentials
//! exchange. [`TokenExchange`] performs the network exchange;
//! [`TokenManager`] shares the current token with the rest of the service
//! and refreshes it in the background before it expires.

#![deny(unsafe_code)]

pub mod errors;
pub mod manager;
pub mod token;

pub use errors::AuthError;
pub use manager::{TokenManager, refresh_delay};
pub use token::{AppToken, TokenExchange};
