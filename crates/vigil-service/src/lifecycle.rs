//! Startup, supervision, and graceful shutdown.
//!
//! One [`Service`] instance owns the whole lifetime: acquire credentials,
//! load the monitor set, start the session loop and the token refresher,
//! then supervise until cancellation or a terminal session failure.
//! Status transitions are published through a [`StatusCell`] that the
//! health endpoint reads.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use vigil_auth::{TokenExchange, TokenManager};
use vigil_core::{ServiceStatus, StatusCell};
use vigil_eventsub::{Connection, ConnectionConfig, Dispatcher, Reconciler};
use vigil_helix::HelixClient;
use vigil_settings::Settings;
use vigil_store::{Backend, RestBackend};

use crate::errors::ServiceError;

/// How long to wait for supervised tasks to drain after cancellation.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The single owning instance of the service lifecycle.
pub struct Service {
    settings: Settings,
    status: StatusCell,
    instance_id: Uuid,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl Service {
    /// Build a service around loaded settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            status: StatusCell::new(),
            instance_id: Uuid::new_v4(),
            started_at: chrono::Utc::now(),
        }
    }

    /// The shared status cell (cloned by the health endpoint).
    pub fn status(&self) -> StatusCell {
        self.status.clone()
    }

    /// Unique id of this process instance.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// First eight characters of the instance id, used in announcements.
    pub fn short_instance_id(&self) -> String {
        self.instance_id.to_string().chars().take(8).collect()
    }

    /// Startup timestamp.
    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    /// Run against the companion backend configured in settings.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ServiceError> {
        let backend = Arc::new(RestBackend::new(self.settings.store.api_base_url.clone()));
        self.run_with_backend(backend, cancel).await
    }

    /// Run with an explicit backend (injected in tests).
    pub async fn run_with_backend(
        &self,
        backend: Arc<dyn Backend>,
        cancel: CancellationToken,
    ) -> Result<(), ServiceError> {
        let result = self.run_inner(backend, cancel).await;
        if result.is_err() {
            self.status.set_status(ServiceStatus::Error);
        }
        result
    }

    async fn run_inner(
        &self,
        backend: Arc<dyn Backend>,
        cancel: CancellationToken,
    ) -> Result<(), ServiceError> {
        info!(instance_id = %self.instance_id, "starting");

        // ── Credentials ─────────────────────────────────────────────
        let exchange = TokenExchange::new(
            self.settings.twitch.token_url.clone(),
            self.settings.twitch.client_id.clone(),
            self.settings.twitch.client_secret.clone(),
        )?;
        let tokens = Arc::new(
            TokenManager::start(
                exchange,
                self.settings.service.token_refresh_safety_factor,
                Duration::from_secs(self.settings.service.token_refresh_retry_secs),
            )
            .await?,
        );

        // ── Monitor set ─────────────────────────────────────────────
        let targets = backend.enabled_targets().await?;
        self.status.set_monitored_targets(targets.len());
        if targets.is_empty() {
            warn!("no enabled monitor targets, the session will idle");
        }

        // ── Supervised tasks ────────────────────────────────────────
        let refresh_tokens = tokens.clone();
        let refresh_cancel = cancel.clone();
        let refresh_handle =
            tokio::spawn(async move { refresh_tokens.refresh_loop(refresh_cancel).await });

        let helix = HelixClient::new(
            self.settings.twitch.helix_url.clone(),
            self.settings.twitch.client_id.clone(),
        );
        let reconciler = Arc::new(Reconciler::new(helix.clone(), tokens.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            backend.clone(),
            helix.clone(),
            tokens.clone(),
            reconciler,
            targets.clone(),
        ));
        let (connection, mut established) = Connection::new(
            ConnectionConfig {
                url: self.settings.twitch.eventsub_ws_url.clone(),
                heartbeat_interval: Duration::from_secs(
                    self.settings.service.heartbeat_interval_secs,
                ),
                heartbeat_timeout: Duration::from_secs(
                    self.settings.service.heartbeat_timeout_secs,
                ),
                welcome_timeout: Duration::from_secs(self.settings.service.welcome_timeout_secs),
                backoff: self.settings.service.reconnect.clone(),
            },
            dispatcher,
        );
        let connection = Arc::new(connection);
        let session_connection = connection.clone();
        let session_cancel = cancel.clone();
        let mut session_handle =
            tokio::spawn(async move { session_connection.run(session_cancel).await });

        // ── First session ───────────────────────────────────────────
        // The session loop can fail terminally before the first welcome
        // (e.g. the endpoint is unreachable), so its handle is part of
        // this wait too.
        let mut early_outcome: Option<Result<(), ServiceError>> = None;
        tokio::select! {
            () = cancel.cancelled() => {}
            result = &mut session_handle => {
                early_outcome = Some(flatten_session(result));
            }
            session_id = wait_established(&mut established) => {
                if let Some(session_id) = session_id {
                    info!(%session_id, "first session established");
                    if self.settings.service.announce_online {
                        self.announce_online(backend.as_ref(), &helix, &tokens, &targets)
                            .await;
                    }
                    self.status.set_status(ServiceStatus::Running);
                }
            }
        }

        // ── Supervision ─────────────────────────────────────────────
        let outcome: Result<(), ServiceError> = match early_outcome {
            Some(outcome) => outcome,
            None => tokio::select! {
                () = cancel.cancelled() => Ok(()),
                result = &mut session_handle => flatten_session(result),
            },
        };

        // ── Drain ───────────────────────────────────────────────────
        self.status.set_status(ServiceStatus::ShuttingDown);
        cancel.cancel();
        if !session_handle.is_finished()
            && tokio::time::timeout(DRAIN_TIMEOUT, &mut session_handle)
                .await
                .is_err()
        {
            warn!("session loop did not drain within the shutdown window");
            session_handle.abort();
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, refresh_handle).await.is_err() {
            warn!("token refresh loop did not drain within the shutdown window");
        }

        if outcome.is_ok() {
            self.status.set_status(ServiceStatus::Stopped);
            info!("stopped");
        }
        outcome
    }

    /// Post the online announcement to every monitored channel.
    ///
    /// Failures are logged per channel and never fatal.
    async fn announce_online(
        &self,
        backend: &dyn Backend,
        helix: &HelixClient,
        tokens: &TokenManager,
        targets: &BTreeSet<String>,
    ) {
        let message = format!(
            "VIP watcher online (instance {}). Monitoring channel point redemptions.",
            self.short_instance_id()
        );
        for target in targets {
            let channel_name = match backend.get_user(target).await {
                Ok(Some(user)) => user.username,
                Ok(None) => {
                    warn!(channel_id = %target, "no user document, skipping announcement");
                    continue;
                }
                Err(e) => {
                    warn!(channel_id = %target, error = %e, "user lookup failed, skipping announcement");
                    continue;
                }
            };
            match helix
                .send_announcement(&tokens.bearer(), target, &message)
                .await
            {
                Ok(()) => {
                    info!(channel_id = %target, channel_name = ?channel_name, "announced online");
                }
                Err(e) => {
                    warn!(channel_id = %target, error = %e, "online announcement failed");
                }
            }
        }
    }
}

/// Collapse a session task result into a service outcome.
fn flatten_session(
    result: Result<Result<(), vigil_eventsub::EventSubError>, tokio::task::JoinError>,
) -> Result<(), ServiceError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "session loop failed");
            Err(ServiceError::EventSub(e))
        }
        Err(e) => Err(ServiceError::Task(e.to_string())),
    }
}

/// Wait for the first established session id.
async fn wait_established(established: &mut watch::Receiver<Option<String>>) -> Option<String> {
    established
        .wait_for(Option::is_some)
        .await
        .ok()
        .and_then(|v| v.clone())
}
