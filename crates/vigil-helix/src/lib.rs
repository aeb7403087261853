//! # vigil-helix
//!
//! Thin client for the two Helix endpoints the service needs:
//! creating websocket EventSub subscriptions (expects 202) and posting
//! chat announcements (expects 204). Authorization is supplied per call
//! so the token manager stays the single owner of credentials.

#![deny(unsafe_code)]

pub mod errors;

use serde::Deserialize;

pub use errors::HelixError;

// ─────────────────────────────────────────────────────────────────────────────
// Subscription kinds
// ─────────────────────────────────────────────────────────────────────────────

/// The event types monitored per channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// A channel-point custom reward was redeemed.
    RedemptionAdd,
    /// A user was granted VIP status.
    VipAdd,
    /// A user had VIP status removed.
    VipRemove,
}

impl SubscriptionKind {
    /// Every kind, in the order subscriptions are created.
    pub const ALL: [Self; 3] = [Self::RedemptionAdd, Self::VipAdd, Self::VipRemove];

    /// The wire name of the subscription type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedemptionAdd => "channel.channel_points_custom_reward_redemption.add",
            Self::VipAdd => "channel.vip.add",
            Self::VipRemove => "channel.vip.remove",
        }
    }

    /// The subscription type version.
    pub fn version(self) -> &'static str {
        "1"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateSubscriptionResponse {
    #[serde(default)]
    data: Vec<CreatedSubscription>,
}

#[derive(Deserialize)]
struct CreatedSubscription {
    id: String,
}

/// Client for the Helix REST API.
#[derive(Clone, Debug)]
pub struct HelixClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
}

impl HelixClient {
    /// Build a client for the given Helix base URL.
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            client_id: client_id.into(),
        }
    }

    /// Create a websocket EventSub subscription bound to `session_id`.
    ///
    /// Returns the id Helix assigned to the subscription.
    #[tracing::instrument(skip_all, fields(kind = kind.as_str(), broadcaster_id))]
    pub async fn create_subscription(
        &self,
        bearer: &str,
        kind: SubscriptionKind,
        broadcaster_id: &str,
        session_id: &str,
    ) -> Result<String, HelixError> {
        let body = serde_json::json!({
            "type": kind.as_str(),
            "version": kind.version(),
            "condition": { "broadcaster_user_id": broadcaster_id },
            "transport": { "method": "websocket", "session_id": session_id },
        });

        let resp = self
            .http
            .post(format!("{}/eventsub/subscriptions", self.base_url))
            .header("Client-ID", &self.client_id)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 202 {
            let message = resp.text().await.unwrap_or_default();
            return Err(HelixError::SubscriptionRejected { status, message });
        }

        let created: CreateSubscriptionResponse = resp.json().await?;
        created
            .data
            .into_iter()
            .next()
            .map(|s| s.id)
            .ok_or(HelixError::MissingSubscriptionId)
    }

    /// Post a chat announcement to the broadcaster's channel.
    #[tracing::instrument(skip_all, fields(broadcaster_id))]
    pub async fn send_announcement(
        &self,
        bearer: &str,
        broadcaster_id: &str,
        message: &str,
    ) -> Result<(), HelixError> {
        let body = serde_json::json!({
            "broadcaster_id": broadcaster_id,
            "message": message,
        });

        let resp = self
            .http
            .post(format!("{}/chat/announcements", self.base_url))
            .header("Client-ID", &self.client_id)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 204 {
            return Err(HelixError::AnnouncementRejected { status });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // ── subscription kinds ──

    #[test]
    fn kind_wire_names() {
        assert_eq!(
            SubscriptionKind::RedemptionAdd.as_str(),
            "channel.channel_points_custom_reward_redemption.add"
        );
        assert_eq!(SubscriptionKind::VipAdd.as_str(), "channel.vip.add");
        assert_eq!(SubscriptionKind::VipRemove.as_str(), "channel.vip.remove");
        for kind in SubscriptionKind::ALL {
            assert_eq!(kind.version(), "1");
        }
    }

    // ── create_subscription ──

    #[tokio::test]
    async fn create_subscription_binds_session_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .and(header("client-id", "cid"))
            .and(header("authorization", "Bearer app-tok"))
            .and(body_partial_json(serde_json::json!({
                "type": "channel.vip.add",
                "version": "1",
                "condition": { "broadcaster_user_id": "chan1" },
                "transport": { "method": "websocket", "session_id": "sess-1" },
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "data": [{"id": "sub-abc", "status": "enabled"}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelixClient::new(server.uri(), "cid");
        let id = client
            .create_subscription("app-tok", SubscriptionKind::VipAdd, "chan1", "sess-1")
            .await
            .unwrap();
        assert_eq!(id, "sub-abc");
    }

    #[tokio::test]
    async fn non_202_is_rejection_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
            .mount(&server)
            .await;

        let client = HelixClient::new(server.uri(), "cid");
        let err = client
            .create_subscription("app-tok", SubscriptionKind::RedemptionAdd, "chan1", "s")
            .await
            .unwrap_err();
        match err {
            HelixError::SubscriptionRejected { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "already exists");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn accepted_without_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let client = HelixClient::new(server.uri(), "cid");
        let err = client
            .create_subscription("app-tok", SubscriptionKind::VipRemove, "chan1", "s")
            .await
            .unwrap_err();
        assert!(matches!(err, HelixError::MissingSubscriptionId));
    }

    // ── send_announcement ──

    #[tokio::test]
    async fn announcement_expects_204() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/announcements"))
            .and(header("client-id", "cid"))
            .and(body_partial_json(serde_json::json!({
                "broadcaster_id": "chan1",
                "message": "hello chat",
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = HelixClient::new(server.uri(), "cid");
        client
            .send_announcement("app-tok", "chan1", "hello chat")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn announcement_rejection_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/announcements"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HelixClient::new(server.uri(), "cid");
        let err = client
            .send_announcement("bad-tok", "chan1", "hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HelixError::AnnouncementRejected { status: 401 }
        ));
    }
}
