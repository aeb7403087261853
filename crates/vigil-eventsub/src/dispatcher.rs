//! Frame dispatch: routes decoded frames to their handlers.
//!
//! Handler failures never tear down the session. Anything that goes wrong
//! while processing a notification is logged and swallowed; only a
//! reconnect frame changes the session's control flow.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use vigil_auth::TokenManager;
use vigil_helix::{HelixClient, SubscriptionKind};
use vigil_store::types::{GrantMetadata, VipGrant};
use vigil_store::Backend;

use crate::frame::{Frame, MessageType, RedemptionEvent, VipEvent};
use crate::reconciler::Reconciler;

/// What the session loop should do after a frame is handled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading from the current connection.
    Continue,
    /// Drop the connection and reconnect to the given endpoint.
    Reconnect(String),
}

/// Routes frames to handlers and owns the per-notification side effects.
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    helix: HelixClient,
    tokens: Arc<TokenManager>,
    reconciler: Arc<Reconciler>,
    targets: BTreeSet<String>,
}

impl Dispatcher {
    /// Build a dispatcher over the monitored target set.
    pub fn new(
        backend: Arc<dyn Backend>,
        helix: HelixClient,
        tokens: Arc<TokenManager>,
        reconciler: Arc<Reconciler>,
        targets: BTreeSet<String>,
    ) -> Self {
        Self {
            backend,
            helix,
            tokens,
            reconciler,
            targets,
        }
    }

    /// The monitored channel ids.
    pub fn targets(&self) -> &BTreeSet<String> {
        &self.targets
    }

    /// Reconcile subscriptions for a freshly established session.
    ///
    /// Returns the number of subscriptions created.
    pub async fn on_welcome(&self, session_id: &str) -> usize {
        self.reconciler.reconcile_all(session_id, &self.targets).await
    }

    /// Handle one raw text frame.
    pub async fn dispatch(&self, raw: &str) -> Flow {
        let frame = match Frame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping undecodable frame");
                return Flow::Continue;
            }
        };

        match frame.metadata.message_type {
            MessageType::SessionKeepalive => {
                debug!(message_id = %frame.metadata.message_id, "keepalive");
            }
            MessageType::Notification => self.handle_notification(&frame).await,
            MessageType::SessionReconnect => {
                if let Some(url) = frame.session().and_then(|s| s.reconnect_url) {
                    info!(%url, "server requested reconnect");
                    return Flow::Reconnect(url);
                }
                warn!("reconnect frame without a target url");
            }
            MessageType::Revocation => {
                if let Some(revoked) = frame.revoked_subscription() {
                    self.reconciler.on_revoked(&revoked);
                } else {
                    warn!("revocation frame without a subscription");
                }
            }
            MessageType::SessionWelcome => {
                // The first welcome is consumed during establishment. One
                // arriving mid-stream means the server restarted the session
                // in place, so subscriptions are rebuilt against the new id.
                if let Some(session) = frame.session() {
                    info!(session_id = %session.id, "mid-stream welcome, rebuilding subscriptions");
                    let _ = self.on_welcome(&session.id).await;
                } else {
                    warn!(message_id = %frame.metadata.message_id,
                        "welcome frame without a session id");
                }
            }
            MessageType::Unknown => {
                debug!(message_id = %frame.metadata.message_id, "ignoring unknown frame type");
            }
        }
        Flow::Continue
    }

    async fn handle_notification(&self, frame: &Frame) {
        let Some(subscription_type) = frame.metadata.subscription_type.as_deref() else {
            warn!("notification without a subscription type");
            return;
        };

        if subscription_type == SubscriptionKind::RedemptionAdd.as_str() {
            if let Some(event) = frame.event::<RedemptionEvent>() {
                self.handle_redemption(event).await;
            } else {
                warn!("redemption notification with undecodable event");
            }
        } else if subscription_type == SubscriptionKind::VipAdd.as_str() {
            if let Some(event) = frame.event::<VipEvent>() {
                info!(channel_id = %event.broadcaster_user_id, user = %event.user_name,
                    "VIP added");
            }
        } else if subscription_type == SubscriptionKind::VipRemove.as_str() {
            if let Some(event) = frame.event::<VipEvent>() {
                info!(channel_id = %event.broadcaster_user_id, user = %event.user_name,
                    "VIP removed");
            }
        } else {
            debug!(subscription_type, "ignoring unhandled notification type");
        }
    }

    /// Grant VIP status for a mapped redemption, then announce it.
    ///
    /// Exactly one announcement per successful grant; a refused or failed
    /// grant announces nothing.
    #[tracing::instrument(skip_all, fields(reward_id = %event.reward.id, user = %event.user_name))]
    async fn handle_redemption(&self, event: RedemptionEvent) {
        let mapping = match self.backend.find_reward(&event.reward.id).await {
            Ok(Some(mapping)) => mapping,
            Ok(None) => {
                debug!("redemption for an unmapped reward, ignoring");
                return;
            }
            Err(e) => {
                warn!(error = %e, "reward lookup failed");
                return;
            }
        };

        let grant = VipGrant {
            channel_id: mapping.channel_id.clone(),
            user_id: event.user_id.clone(),
            username: event.user_name.clone(),
            granted_by: mapping.channel_id.clone(),
            grant_method: "channelPoints".to_string(),
            metadata: GrantMetadata {
                reward_id: event.reward.id.clone(),
                reward_title: event.reward.title.clone(),
                redemption_id: event.id.clone(),
            },
        };

        match self.backend.grant_vip(&grant).await {
            Ok(outcome) if outcome.success => {
                info!(channel_id = %mapping.channel_id, "VIP granted");
                let message = format!(
                    "{} has been granted VIP status by redeeming {}!",
                    event.user_name, event.reward.title
                );
                if let Err(e) = self
                    .helix
                    .send_announcement(&self.tokens.bearer(), &mapping.channel_id, &message)
                    .await
                {
                    warn!(error = %e, "announcement failed after grant");
                }
            }
            Ok(outcome) => {
                warn!(error = ?outcome.error, "VIP grant refused");
            }
            Err(e) => {
                warn!(error = %e, "VIP grant call failed");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
