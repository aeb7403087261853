//! # vigil-eventsub
//!
//! The EventSub websocket session: frame decoding, notification dispatch,
//! subscription reconciliation, and the durable connection loop with
//! heartbeat and bounded reconnect.
//!
//! The [`Connection`] owns the session lifetime; collaborators (token
//! manager, Helix client, store backend) are injected so every network
//! edge can be faked in tests.

#![deny(unsafe_code)]

pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod frame;
pub mod reconciler;

pub use connection::{Connection, ConnectionConfig};
pub use dispatcher::{Dispatcher, Flow};
pub use errors::EventSubError;
pub use frame::{Frame, MessageType};
pub use reconciler::Reconciler;
