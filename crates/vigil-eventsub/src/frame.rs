//! EventSub websocket frame envelope and payload views.
//!
//! Every frame is a JSON object with a `metadata` block (id, type,
//! timestamp) and a type-dependent `payload`. The payload is kept as a raw
//! [`serde_json::Value`] and decoded into a view on demand so an unexpected
//! shape in one field cannot poison the whole frame.

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// The discriminant in `metadata.message_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// First frame after connect, carries the session id.
    SessionWelcome,
    /// Periodic liveness signal, no payload of interest.
    SessionKeepalive,
    /// A subscribed event fired.
    Notification,
    /// The server wants us to move to a new endpoint.
    SessionReconnect,
    /// A subscription was revoked server-side.
    Revocation,
    /// Anything this build does not know about.
    #[serde(other)]
    Unknown,
}

/// The `metadata` block common to every frame.
#[derive(Clone, Debug, Deserialize)]
pub struct FrameMetadata {
    /// Server-assigned frame id.
    pub message_id: String,
    /// Frame discriminant.
    pub message_type: MessageType,
    /// RFC 3339 send time.
    #[serde(default)]
    pub message_timestamp: Option<String>,
    /// Subscription type for notification frames.
    #[serde(default)]
    pub subscription_type: Option<String>,
}

/// A decoded frame envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct Frame {
    /// Frame metadata.
    pub metadata: FrameMetadata,
    /// Raw payload, decoded per message type.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Frame {
    /// Decode a raw text frame.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The `payload.session` block of welcome and reconnect frames.
    pub fn session(&self) -> Option<SessionInfo> {
        serde_json::from_value::<SessionPayload>(self.payload.clone())
            .ok()
            .map(|p| p.session)
    }

    /// The `payload.subscription` block of revocation frames.
    pub fn revoked_subscription(&self) -> Option<RevokedSubscription> {
        serde_json::from_value::<RevocationPayload>(self.payload.clone())
            .ok()
            .map(|p| p.subscription)
    }

    /// The `payload.event` block of notification frames, decoded as `E`.
    pub fn event<E: DeserializeOwned>(&self) -> Option<E> {
        self.payload
            .get("event")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Deserialize)]
struct SessionPayload {
    session: SessionInfo,
}

/// Session description inside welcome and reconnect frames.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionInfo {
    /// Session id, bound into every subscription.
    pub id: String,
    /// Target endpoint for reconnect frames.
    #[serde(default)]
    pub reconnect_url: Option<String>,
}

#[derive(Deserialize)]
struct RevocationPayload {
    subscription: RevokedSubscription,
}

/// Subscription description inside a revocation frame.
#[derive(Clone, Debug, Deserialize)]
pub struct RevokedSubscription {
    /// The revoked subscription id.
    pub id: String,
    /// Revocation reason reported by the server.
    #[serde(default)]
    pub status: Option<String>,
}

/// Event payload of a channel-point redemption notification.
#[derive(Clone, Debug, Deserialize)]
pub struct RedemptionEvent {
    /// Channel the redemption happened in.
    pub broadcaster_user_id: String,
    /// Redeeming user's id.
    pub user_id: String,
    /// Redeeming user's display name.
    pub user_name: String,
    /// Redemption event id.
    pub id: String,
    /// The redeemed reward.
    pub reward: RedeemedReward,
}

/// The reward block inside a redemption event.
#[derive(Clone, Debug, Deserialize)]
pub struct RedeemedReward {
    /// Reward id, matched against stored mappings.
    pub id: String,
    /// Reward title, echoed in grant metadata and announcements.
    pub title: String,
    /// Point cost.
    #[serde(default)]
    pub cost: u64,
}

/// Event payload of VIP add/remove notifications.
#[derive(Clone, Debug, Deserialize)]
pub struct VipEvent {
    /// Channel the VIP change happened in.
    pub broadcaster_user_id: String,
    /// Affected user's id.
    pub user_id: String,
    /// Affected user's display name.
    pub user_name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
