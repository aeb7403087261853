//! # vigil-store
//!
//! Collaborator calls to the companion backend: the monitor-target set,
//! per-channel reward mappings, stored user credentials, and the VIP grant
//! call. The core never talks to the underlying database directly; it sees
//! the [`Backend`] trait and whatever implements it.
//!
//! Implementations:
//! - [`RestBackend`]: the companion HTTP API (production)
//! - [`MemoryBackend`]: in-memory fixture with a call log (tests)

#![deny(unsafe_code)]

pub mod errors;
pub mod memory;
pub mod rest;
pub mod types;

use std::collections::BTreeSet;

use async_trait::async_trait;

pub use errors::StoreError;
pub use memory::MemoryBackend;
pub use rest::RestBackend;
pub use types::{GrantOutcome, RewardMapping, UserRecord, VipGrant};

/// The external store and privilege-grant collaborators.
#[async_trait]
pub trait Backend: Send + Sync {
    /// One-shot load of the channel ids with an enabled reward mapping.
    ///
    /// Loaded once at startup; the set is static for the process lifetime,
    /// so store changes require a restart to be picked up.
    async fn enabled_targets(&self) -> Result<BTreeSet<String>, StoreError>;

    /// Look up the reward mapping for a redeemed reward id.
    async fn find_reward(&self, reward_id: &str) -> Result<Option<RewardMapping>, StoreError>;

    /// Look up a channel's stored user document.
    async fn get_user(&self, channel_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Ask the backend to grant VIP status.
    ///
    /// A rejection is an outcome, not an error: the caller logs it and moves
    /// on. `Err` is reserved for transport failures.
    async fn grant_vip(&self, grant: &VipGrant) -> Result<GrantOutcome, StoreError>;
}
