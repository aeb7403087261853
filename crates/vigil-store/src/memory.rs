//! In-memory [`Backend`] fixture for tests.
//!
//! Holds rewards and users in maps and records every grant it receives,
//! plus an ordered call log so tests can assert sequencing across
//! collaborators.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::types::{GrantOutcome, RewardMapping, UserRecord, VipGrant};
use crate::Backend;

/// Test double for the companion backend.
#[derive(Default)]
pub struct MemoryBackend {
    rewards: Mutex<HashMap<String, RewardMapping>>,
    users: Mutex<HashMap<String, UserRecord>>,
    grant_outcome: Mutex<GrantOutcome>,
    grants: Mutex<Vec<VipGrant>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryBackend {
    /// Empty backend: no targets, no rewards, no users, grants fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reward mapping (keyed by reward id).
    pub fn with_reward(self, mapping: RewardMapping) -> Self {
        let _ = self
            .rewards
            .lock()
            .insert(mapping.reward_id.clone(), mapping);
        self
    }

    /// Add a user document (keyed by user id).
    pub fn with_user(self, user: UserRecord) -> Self {
        let _ = self.users.lock().insert(user.user_id.clone(), user);
        self
    }

    /// Set the outcome returned by every subsequent grant call.
    pub fn with_grant_outcome(self, outcome: GrantOutcome) -> Self {
        *self.grant_outcome.lock() = outcome;
        self
    }

    /// Every grant request received so far.
    pub fn grants(&self) -> Vec<VipGrant> {
        self.grants.lock().clone()
    }

    /// Ordered names of every backend call made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn enabled_targets(&self) -> Result<BTreeSet<String>, StoreError> {
        self.record("enabled_targets");
        Ok(self
            .rewards
            .lock()
            .values()
            .filter(|r| r.is_enabled)
            .map(|r| r.channel_id.clone())
            .collect())
    }

    async fn find_reward(&self, reward_id: &str) -> Result<Option<RewardMapping>, StoreError> {
        self.record(format!("find_reward:{reward_id}"));
        Ok(self
            .rewards
            .lock()
            .get(reward_id)
            .filter(|r| r.is_enabled)
            .cloned())
    }

    async fn get_user(&self, channel_id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.record(format!("get_user:{channel_id}"));
        Ok(self.users.lock().get(channel_id).cloned())
    }

    async fn grant_vip(&self, grant: &VipGrant) -> Result<GrantOutcome, StoreError> {
        self.record(format!("grant_vip:{}", grant.user_id));
        self.grants.lock().push(grant.clone());
        Ok(self.grant_outcome.lock().clone())
    }
}
