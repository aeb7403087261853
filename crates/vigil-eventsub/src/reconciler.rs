//! Subscription reconciliation against the active session.
//!
//! Subscriptions are bound to a session id and die with the session, so
//! every welcome starts from a clean slate: the tracked set is cleared and
//! all three kinds are re-created for every monitored channel. A rejected
//! create is logged and skipped; one broken channel must not block the
//! rest.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use vigil_auth::TokenManager;
use vigil_helix::{HelixClient, SubscriptionKind};

use crate::frame::RevokedSubscription;

/// Tracks which subscription ids are live on the current session.
pub struct Reconciler {
    helix: HelixClient,
    tokens: Arc<TokenManager>,
    active: Mutex<HashSet<String>>,
}

impl Reconciler {
    /// Build a reconciler around the Helix client and token source.
    pub fn new(helix: HelixClient, tokens: Arc<TokenManager>) -> Self {
        Self {
            helix,
            tokens,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Re-create every subscription for the given session.
    ///
    /// Returns the number of subscriptions successfully created.
    #[tracing::instrument(skip_all, fields(session_id, targets = targets.len()))]
    pub async fn reconcile_all(&self, session_id: &str, targets: &BTreeSet<String>) -> usize {
        self.active.lock().clear();

        let bearer = self.tokens.bearer();
        let mut created = 0usize;
        for target in targets {
            for kind in SubscriptionKind::ALL {
                match self
                    .helix
                    .create_subscription(&bearer, kind, target, session_id)
                    .await
                {
                    Ok(id) => {
                        let _ = self.active.lock().insert(id);
                        created += 1;
                    }
                    Err(e) => {
                        warn!(channel_id = %target, kind = kind.as_str(), error = %e,
                            "failed to create subscription");
                    }
                }
            }
        }
        info!(created, "subscriptions reconciled");
        created
    }

    /// Record a server-side revocation.
    ///
    /// Unknown ids are ignored; a revocation can race a reconcile that
    /// already dropped the old session's set.
    pub fn on_revoked(&self, revoked: &RevokedSubscription) {
        if self.active.lock().remove(&revoked.id) {
            warn!(subscription_id = %revoked.id, status = ?revoked.status,
                "subscription revoked");
        } else {
            debug!(subscription_id = %revoked.id, "revocation for untracked subscription");
        }
    }

    /// Number of subscriptions believed live.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;
    use vigil_auth::{AppToken, TokenExchange};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn static_tokens() -> Arc<TokenManager> {
        let exchange =
            TokenExchange::new("http://localhost/oauth2/token", "cid", "secret").unwrap();
        let token = AppToken {
            access_token: "app-tok".into(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        Arc::new(TokenManager::new(
            exchange,
            token,
            0.9,
            Duration::from_secs(30),
        ))
    }

    fn accepted(id: &str) -> ResponseTemplate {
        ResponseTemplate::new(202)
            .set_body_json(serde_json::json!({"data": [{"id": id, "status": "enabled"}]}))
    }

    #[tokio::test]
    async fn creates_all_kinds_per_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .and(body_partial_json(serde_json::json!({
                "transport": {"session_id": "sess-1"},
            })))
            .respond_with(accepted("sub-x"))
            .expect(6)
            .mount(&server)
            .await;

        let reconciler = Reconciler::new(HelixClient::new(server.uri(), "cid"), static_tokens());
        let targets: BTreeSet<String> = ["chan1", "chan2"].iter().map(|s| s.to_string()).collect();
        let created = reconciler.reconcile_all("sess-1", &targets).await;
        assert_eq!(created, 6);
    }

    #[tokio::test]
    async fn rejected_create_skips_and_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .and(body_partial_json(
                serde_json::json!({"condition": {"broadcaster_user_id": "chan1"}}),
            ))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .and(body_partial_json(
                serde_json::json!({"condition": {"broadcaster_user_id": "chan2"}}),
            ))
            .respond_with(accepted("sub-ok"))
            .mount(&server)
            .await;

        let reconciler = Reconciler::new(HelixClient::new(server.uri(), "cid"), static_tokens());
        let targets: BTreeSet<String> = ["chan1", "chan2"].iter().map(|s| s.to_string()).collect();
        let created = reconciler.reconcile_all("sess-1", &targets).await;
        assert_eq!(created, 3);
    }

    #[tokio::test]
    async fn reconcile_replaces_previous_session_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/eventsub/subscriptions"))
            .respond_with(accepted("sub-1"))
            .mount(&server)
            .await;

        let reconciler = Reconciler::new(HelixClient::new(server.uri(), "cid"), static_tokens());
        let targets: BTreeSet<String> = ["chan1"].iter().map(|s| s.to_string()).collect();

        let _ = reconciler.reconcile_all("sess-1", &targets).await;
        let _ = reconciler.reconcile_all("sess-2", &targets).await;
        // Same ids re-created on the new session, set does not accumulate.
        assert_eq!(reconciler.active_count(), 1);
    }

    #[tokio::test]
    async fn revocation_of_unknown_id_is_a_no_op() {
        let server = MockServer::start().await;
        let reconciler = Reconciler::new(HelixClient::new(server.uri(), "cid"), static_tokens());
        reconciler.on_revoked(&RevokedSubscription {
            id: "sub-ghost".into(),
            status: Some("authorization_revoked".into()),
        });
        assert_eq!(reconciler.active_count(), 0);
    }
}
