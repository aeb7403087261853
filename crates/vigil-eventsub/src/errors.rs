//! Session error types.

use std::time::Duration;

/// Errors from the EventSub websocket session.
#[derive(Debug, thiserror::Error)]
pub enum EventSubError {
    /// Websocket transport failure.
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The peer violated the expected message sequence.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No welcome frame arrived within the allowed window.
    #[error("no session welcome within {0:?}")]
    WelcomeTimeout(Duration),

    /// The peer stopped answering pings.
    #[error("heartbeat timed out")]
    HeartbeatTimeout,

    /// Every reconnect attempt in the budget failed.
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_display_names_attempts() {
        let err = EventSubError::ReconnectExhausted { attempts: 11 };
        assert_eq!(err.to_string(), "gave up reconnecting after 11 attempts");
    }
}
