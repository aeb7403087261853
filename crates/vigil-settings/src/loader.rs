//! Settings loading with environment variable overrides.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::Result;
use crate::types::Settings;

/// Resolve the default path to the config file (`/etc/vigil/config.json`,
/// overridable via `VIGIL_CONFIG`).
pub fn settings_path() -> PathBuf {
    std::env::var("VIGIL_CONFIG")
        .map_or_else(|_| PathBuf::from("/etc/vigil/config.json"), PathBuf::from)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let mut settings = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)?
    } else {
        debug!(?path, "settings file not found, using defaults");
        Settings::default()
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Apply environment variable overrides to loaded settings.
///
/// Integers must parse and fall within the stated range; invalid values are
/// logged and ignored (falling back to file/default).
pub fn apply_env_overrides(settings: &mut Settings) {
    // ── Application identity ────────────────────────────────────────
    if let Some(v) = read_env_string("TWITCH_CLIENT_ID") {
        settings.twitch.client_id = v;
    }
    if let Some(v) = read_env_string("TWITCH_CLIENT_SECRET") {
        settings.twitch.client_secret = v;
    }

    // ── Endpoints ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_HELIX_URL") {
        settings.twitch.helix_url = v;
    }
    if let Some(v) = read_env_string("VIGIL_EVENTSUB_WS_URL") {
        settings.twitch.eventsub_ws_url = v;
    }
    if let Some(v) = read_env_string("VIGIL_API_BASE_URL") {
        settings.store.api_base_url = v;
    }

    // ── Timing ──────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("VIGIL_HEARTBEAT_INTERVAL_SECS", 1, 600) {
        settings.service.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_env_u64("VIGIL_HEARTBEAT_TIMEOUT_SECS", 1, 600) {
        settings.service.heartbeat_timeout_secs = v;
    }
    if let Some(v) = read_env_u64("VIGIL_MAX_RECONNECT_ATTEMPTS", 1, 1000) {
        #[allow(clippy::cast_possible_truncation)]
        {
            settings.service.reconnect.max_attempts = v as u32;
        }
    }

    // ── Health endpoint ─────────────────────────────────────────────
    if let Some(v) = read_env_u16("VIGIL_HEALTH_PORT", 1, 65535) {
        settings.service.health_port = v;
    }
    if let Some(v) = read_env_string("VIGIL_HEALTH_HOST") {
        settings.service.health_host = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
