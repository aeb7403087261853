//! Shared token state and the background refresh loop.

use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::AuthError;
use crate::token::{AppToken, TokenExchange};

/// Delay before a refresh, given the remaining token lifetime.
///
/// The refresh is scheduled at `remaining * safety_factor` so it lands
/// before the final slice of the lifetime; with a 0.9 factor a token is
/// refreshed while 10% of its lifetime is still left.
pub fn refresh_delay(remaining: Duration, safety_factor: f64) -> Duration {
    remaining.mul_f64(safety_factor.clamp(0.0, 1.0))
}

/// Owns the current app access token and refreshes it before expiry.
///
/// `bearer()` readers only require the value to be eventually refreshed;
/// there is exactly one writer (the refresh loop), so a plain RwLock
/// serializes access.
#[derive(Debug)]
pub struct TokenManager {
    exchange: TokenExchange,
    current: RwLock<AppToken>,
    safety_factor: f64,
    retry_delay: Duration,
}

impl TokenManager {
    /// Wrap an already-acquired token.
    pub fn new(
        exchange: TokenExchange,
        initial: AppToken,
        safety_factor: f64,
        retry_delay: Duration,
    ) -> Self {
        Self {
            exchange,
            current: RwLock::new(initial),
            safety_factor,
            retry_delay,
        }
    }

    /// Acquire the initial token and build a manager around it.
    ///
    /// Failure here is fatal to startup; the caller decides what to do.
    pub async fn start(
        exchange: TokenExchange,
        safety_factor: f64,
        retry_delay: Duration,
    ) -> Result<Self, AuthError> {
        let initial = exchange.acquire().await?;
        Ok(Self::new(exchange, initial, safety_factor, retry_delay))
    }

    /// Current bearer value.
    pub fn bearer(&self) -> String {
        self.current.read().access_token.clone()
    }

    /// Application client id.
    pub fn client_id(&self) -> &str {
        self.exchange.client_id()
    }

    /// Time remaining on the current token.
    pub fn expires_in(&self) -> Duration {
        self.current.read().remaining(Instant::now())
    }

    /// Refresh the token on a timer until cancelled.
    ///
    /// Each cycle sleeps until the safety margin, then re-acquires. A failed
    /// exchange is retried after a fixed delay rather than propagated:
    /// refresh must never take down the session loop.
    pub async fn refresh_loop(&self, cancel: CancellationToken) {
        loop {
            let delay = refresh_delay(self.expires_in(), self.safety_factor);
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("token refresh loop cancelled");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            loop {
                match self.exchange.acquire().await {
                    Ok(token) => {
                        *self.current.write() = token;
                        info!("app access token refreshed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, retry_secs = self.retry_delay.as_secs(),
                            "token refresh failed, will retry");
                        tokio::select! {
                            () = cancel.cancelled() => {
                                debug!("token refresh loop cancelled");
                                return;
                            }
                            () = tokio::time::sleep(self.retry_delay) => {}
                        }
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
