//! Configuration types.
//!
//! Every field carries a serde default so a partial config file only
//! overrides what it names.

use serde::{Deserialize, Serialize};
use vigil_core::BackoffPolicy;

/// Top-level service configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Twitch endpoints and application identity.
    pub twitch: TwitchSettings,
    /// Session, heartbeat and refresh timing.
    pub service: ServiceSettings,
    /// Companion backend API.
    pub store: StoreSettings,
}

/// Twitch endpoints and application identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwitchSettings {
    /// Application client id (required at runtime, empty by default).
    pub client_id: String,
    /// Application client secret (required at runtime, empty by default).
    pub client_secret: String,
    /// Helix REST base URL.
    pub helix_url: String,
    /// OAuth token endpoint for the client-credentials exchange.
    pub token_url: String,
    /// EventSub WebSocket endpoint.
    pub eventsub_ws_url: String,
}

impl Default for TwitchSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            helix_url: "https://api.twitch.tv/helix".into(),
            token_url: "https://id.twitch.tv/oauth2/token".into(),
            eventsub_ws_url: "wss://eventsub.wss.twitch.tv/ws".into(),
        }
    }
}

/// Session, heartbeat and credential-refresh timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSettings {
    /// Interval between liveness pings in seconds.
    pub heartbeat_interval_secs: u64,
    /// How long to wait for a pong before force-closing, in seconds.
    pub heartbeat_timeout_secs: u64,
    /// How long to wait for the welcome frame after connecting, in seconds.
    pub welcome_timeout_secs: u64,
    /// Reconnect backoff parameters.
    pub reconnect: BackoffPolicy,
    /// Fraction of the token lifetime after which a refresh is scheduled.
    pub token_refresh_safety_factor: f64,
    /// Fixed retry delay after a failed token refresh, in seconds.
    pub token_refresh_retry_secs: u64,
    /// Whether to announce in chat when the service comes online.
    pub announce_online: bool,
    /// Host for the health endpoint.
    pub health_host: String,
    /// Port for the health endpoint.
    pub health_port: u16,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 10,
            heartbeat_timeout_secs: 5,
            welcome_timeout_secs: 10,
            reconnect: BackoffPolicy::default(),
            token_refresh_safety_factor: 0.9,
            token_refresh_retry_secs: 30,
            announce_online: true,
            health_host: "127.0.0.1".into(),
            health_port: 8081,
        }
    }
}

/// Companion backend API carrying the monitor store and the VIP grant call.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Base URL of the companion API.
    pub api_base_url: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
