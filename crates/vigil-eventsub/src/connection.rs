//! The durable websocket session loop.
//!
//! One bounded loop owns the whole lifetime: connect, wait for the welcome,
//! reconcile subscriptions, then pump frames until the session ends. The
//! attempt counter is plain local state, reset to zero whenever a welcome
//! arrives, and a server-directed reconnect bypasses backoff entirely.
//!
//! Liveness is enforced from our side: a ping every interval, and a pong
//! deadline that tears the session down when the peer goes quiet.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use vigil_core::BackoffPolicy;

use crate::dispatcher::{Dispatcher, Flow};
use crate::errors::EventSubError;
use crate::frame::{Frame, MessageType};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Session loop parameters.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Base websocket endpoint.
    pub url: String,
    /// Interval between outgoing pings.
    pub heartbeat_interval: Duration,
    /// How long to wait for a pong before declaring the peer dead.
    pub heartbeat_timeout: Duration,
    /// How long to wait for the welcome frame after connecting.
    pub welcome_timeout: Duration,
    /// Reconnect backoff budget.
    pub backoff: BackoffPolicy,
}

/// How a driven session ended.
enum SessionEnd {
    /// The peer closed the connection.
    Closed,
    /// The peer redirected us to a new endpoint.
    Reconnect(String),
    /// Shutdown was requested.
    Cancelled,
}

/// Owns the connect/reconnect loop for one EventSub session.
pub struct Connection {
    config: ConnectionConfig,
    dispatcher: Arc<Dispatcher>,
    established_tx: watch::Sender<Option<String>>,
}

impl Connection {
    /// Build a connection and the watch that reports established sessions.
    ///
    /// The receiver holds `None` until a welcome completes, then the current
    /// session id; it changes again on every re-established session.
    pub fn new(
        config: ConnectionConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> (Self, watch::Receiver<Option<String>>) {
        let (established_tx, established_rx) = watch::channel(None);
        (
            Self {
                config,
                dispatcher,
                established_tx,
            },
            established_rx,
        )
    }

    /// Current session id, if a session is established.
    pub fn session_id(&self) -> Option<String> {
        self.established_tx.borrow().clone()
    }

    /// Run the session until cancelled or the reconnect budget is exhausted.
    ///
    /// Returns `Ok(())` only on cancellation; every other exit is an error.
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), EventSubError> {
        let mut attempts: u32 = 0;
        let mut url = self.config.url.clone();

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            match self.establish(&url).await {
                Ok((stream, session_id)) => {
                    attempts = 0;
                    let created = self.dispatcher.on_welcome(&session_id).await;
                    info!(%session_id, subscriptions = created, "session established");
                    let _ = self.established_tx.send_replace(Some(session_id));

                    match self.drive(stream, &cancel).await {
                        Ok(SessionEnd::Cancelled) => return Ok(()),
                        Ok(SessionEnd::Reconnect(next)) => {
                            // Server-directed move: no backoff, no attempt
                            // charged. The redirect URL is used once; a
                            // failure there falls back to the base endpoint.
                            url = next;
                            continue;
                        }
                        Ok(SessionEnd::Closed) => {
                            warn!("session closed by peer");
                        }
                        Err(e) => {
                            warn!(error = %e, "session failed");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, %url, "failed to establish session");
                }
            }

            let _ = self.established_tx.send_replace(None);
            url = self.config.url.clone();

            attempts += 1;
            if self.config.backoff.exhausted(attempts) {
                return Err(EventSubError::ReconnectExhausted { attempts });
            }
            let delay = self.config.backoff.delay_for(attempts - 1);
            debug!(attempt = attempts, ?delay, "reconnect backoff");
            tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Connect and consume frames until the welcome arrives.
    async fn establish(&self, url: &str) -> Result<(WsStream, String), EventSubError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, mut reader) = stream.split();

        let wait_for_welcome = async {
            loop {
                match reader.next().await {
                    None => {
                        return Err(EventSubError::Protocol(
                            "connection closed before welcome".to_string(),
                        ));
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(frame) = Frame::parse(text.as_str()) {
                            if frame.metadata.message_type == MessageType::SessionWelcome {
                                if let Some(session) = frame.session() {
                                    return Ok(session.id);
                                }
                                return Err(EventSubError::Protocol(
                                    "welcome frame without a session id".to_string(),
                                ));
                            }
                            debug!(message_type = ?frame.metadata.message_type,
                                "pre-welcome frame ignored");
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }
        };

        let session_id = tokio::time::timeout(self.config.welcome_timeout, wait_for_welcome)
            .await
            .map_err(|_| EventSubError::WelcomeTimeout(self.config.welcome_timeout))??;

        let stream = match reader.reunite(sink) {
            Ok(stream) => stream,
            Err(_) => {
                return Err(EventSubError::Protocol(
                    "stream halves lost each other".to_string(),
                ));
            }
        };
        Ok((stream, session_id))
    }

    /// Pump one established session until it ends.
    async fn drive(
        &self,
        stream: WsStream,
        cancel: &CancellationToken,
    ) -> Result<SessionEnd, EventSubError> {
        let (mut sink, mut reader) = stream.split();
        let mut ping_timer = tokio::time::interval(self.config.heartbeat_interval);
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut pong_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Cancelled);
                }
                _ = ping_timer.tick() => {
                    sink.send(Message::Ping(Bytes::new())).await?;
                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + self.config.heartbeat_timeout);
                    }
                }
                () = wait_until(pong_deadline) => {
                    return Err(EventSubError::HeartbeatTimeout);
                }
                msg = reader.next() => match msg {
                    None => return Ok(SessionEnd::Closed),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Close(_))) => return Ok(SessionEnd::Closed),
                    Some(Ok(Message::Pong(_))) => pong_deadline = None,
                    Some(Ok(Message::Ping(payload))) => {
                        sink.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Text(text))) => {
                        match self.dispatcher.dispatch(text.as_str()).await {
                            Flow::Continue => {}
                            Flow::Reconnect(url) => return Ok(SessionEnd::Reconnect(url)),
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

/// Sleep until the deadline, or forever when there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
