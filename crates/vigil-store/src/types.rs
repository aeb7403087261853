//! Wire types for the companion backend API (camelCase on the wire).

use serde::{Deserialize, Serialize};

/// A channel-point reward configured to grant VIP status.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RewardMapping {
    /// The vendor-assigned reward id.
    pub reward_id: String,
    /// The channel the reward belongs to.
    pub channel_id: String,
    /// Whether monitoring is enabled for this mapping.
    #[serde(default)]
    pub is_enabled: bool,
}

/// A channel's stored user document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// The channel/user id.
    pub user_id: String,
    /// Display name, if known.
    #[serde(default)]
    pub username: Option<String>,
    /// Stored per-user credential.
    #[serde(default)]
    pub tokens: Option<UserTokens>,
}

/// The per-user credential block inside a user document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTokens {
    /// The user's access token, used to authorize the VIP grant.
    pub access_token: String,
}

impl UserRecord {
    /// The stored user access token, if present.
    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }
}

/// Request body for the VIP grant call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VipGrant {
    /// Channel receiving the VIP.
    pub channel_id: String,
    /// User being granted VIP status.
    pub user_id: String,
    /// Display name of the user.
    pub username: String,
    /// Who initiated the grant (the broadcaster for redemptions).
    pub granted_by: String,
    /// How the grant was triggered.
    pub grant_method: String,
    /// Redemption context for auditing.
    pub metadata: GrantMetadata,
}

/// Redemption context attached to a grant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantMetadata {
    /// The redeemed reward id.
    pub reward_id: String,
    /// The redeemed reward title.
    pub reward_title: String,
    /// The redemption event id.
    pub redemption_id: String,
}

/// Backend verdict on a grant request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GrantOutcome {
    /// Whether the grant was applied.
    #[serde(default)]
    pub success: bool,
    /// Error description when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
