//! Full-lifecycle tests: mocked OAuth and Helix endpoints, a fake EventSub
//! websocket, and an injected in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_core::ServiceStatus;
use vigil_service::{Service, ServiceError};
use vigil_settings::Settings;
use vigil_store::types::{GrantOutcome, RewardMapping, UserRecord, UserTokens};
use vigil_store::{MemoryBackend, RestBackend};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

async fn mock_twitch() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"access_token": "app-tok", "expires_in": 3600}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/eventsub/subscriptions"))
        .respond_with(ResponseTemplate::new(202).set_body_json(
            serde_json::json!({"data": [{"id": "sub-x", "status": "enabled"}]}),
        ))
        .mount(&server)
        .await;
    server
}

fn settings_for(twitch: &MockServer, ws_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.twitch.client_id = "cid".into();
    settings.twitch.client_secret = "secret".into();
    settings.twitch.token_url = format!("{}/oauth2/token", twitch.uri());
    settings.twitch.helix_url = twitch.uri();
    settings.twitch.eventsub_ws_url = ws_url.to_string();
    settings.service.heartbeat_interval_secs = 1;
    settings.service.heartbeat_timeout_secs = 1;
    settings.service.welcome_timeout_secs = 5;
    settings.service.reconnect.base_delay_ms = 10;
    settings.service.reconnect.max_delay_ms = 50;
    settings
}

fn populated_backend() -> Arc<MemoryBackend> {
    Arc::new(
        MemoryBackend::new()
            .with_reward(RewardMapping {
                reward_id: "r1".into(),
                channel_id: "chan1".into(),
                is_enabled: true,
            })
            .with_user(UserRecord {
                user_id: "chan1".into(),
                username: Some("streamer".into()),
                tokens: Some(UserTokens {
                    access_token: "u-tok".into(),
                }),
            })
            .with_grant_outcome(GrantOutcome {
                success: true,
                error: None,
            }),
    )
}

async fn spawn_ws_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let _ = tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let _ = tokio::spawn(async move {
                let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
                ws.send(Message::text(
                    serde_json::json!({
                        "metadata": {"message_id": "w", "message_type": "session_welcome"},
                        "payload": {"session": {"id": "sess-1", "status": "connected"}}
                    })
                    .to_string(),
                ))
                .await
                .unwrap();
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });
    url
}

async fn wait_for_status(service: &Service, expected: ServiceStatus) {
    let status = service.status();
    tokio::time::timeout(Duration::from_secs(10), async {
        while status.status() != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "status never reached {expected:?}, stuck at {:?}",
            status.status()
        )
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn boots_announces_and_shuts_down_gracefully() {
    let twitch = mock_twitch().await;
    Mock::given(method("POST"))
        .and(path("/chat/announcements"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&twitch)
        .await;

    let ws_url = spawn_ws_endpoint().await;
    let service = Arc::new(Service::new(settings_for(&twitch, &ws_url)));
    let cancel = CancellationToken::new();

    let run_service = service.clone();
    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        run_service
            .run_with_backend(populated_backend(), run_cancel)
            .await
    });

    wait_for_status(&service, ServiceStatus::Running).await;
    assert_eq!(service.status().monitored_targets(), 1);

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert_eq!(service.status().status(), ServiceStatus::Stopped);
}

#[tokio::test]
async fn announcements_can_be_disabled() {
    let twitch = mock_twitch().await;
    Mock::given(method("POST"))
        .and(path("/chat/announcements"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&twitch)
        .await;

    let ws_url = spawn_ws_endpoint().await;
    let mut settings = settings_for(&twitch, &ws_url);
    settings.service.announce_online = false;
    let service = Arc::new(Service::new(settings));
    let cancel = CancellationToken::new();

    let run_service = service.clone();
    let run_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        run_service
            .run_with_backend(populated_backend(), run_cancel)
            .await
    });

    wait_for_status(&service, ServiceStatus::Running).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn missing_identity_is_fatal_at_startup() {
    let twitch = mock_twitch().await;
    let mut settings = settings_for(&twitch, "ws://127.0.0.1:1/ws");
    settings.twitch.client_id = String::new();

    let service = Service::new(settings);
    let err = service
        .run_with_backend(populated_backend(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(_)));
    assert_eq!(service.status().status(), ServiceStatus::Error);
}

#[tokio::test]
async fn rejected_token_exchange_is_fatal() {
    let twitch = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
        .mount(&twitch)
        .await;

    let service = Service::new(settings_for(&twitch, "ws://127.0.0.1:1/ws"));
    let err = service
        .run_with_backend(populated_backend(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Auth(_)));
    assert_eq!(service.status().status(), ServiceStatus::Error);
}

#[tokio::test]
async fn monitor_set_load_failure_is_fatal() {
    let twitch = mock_twitch().await;
    let store = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rewards"))
        .respond_with(ResponseTemplate::new(500).set_body_string("firestore down"))
        .mount(&store)
        .await;

    let service = Service::new(settings_for(&twitch, "ws://127.0.0.1:1/ws"));
    let backend = Arc::new(RestBackend::new(store.uri()));
    let err = service
        .run_with_backend(backend, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
    assert_eq!(service.status().status(), ServiceStatus::Error);
}

#[tokio::test]
async fn exhausted_reconnects_end_in_error_state() {
    let twitch = mock_twitch().await;

    // Bind then drop so the endpoint refuses connections.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut settings = settings_for(&twitch, &dead_url);
    settings.service.reconnect.base_delay_ms = 1;
    settings.service.reconnect.max_delay_ms = 5;
    settings.service.reconnect.max_attempts = 2;

    let service = Service::new(settings);
    let err = service
        .run_with_backend(populated_backend(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::EventSub(_)));
    assert_eq!(service.status().status(), ServiceStatus::Error);
}
