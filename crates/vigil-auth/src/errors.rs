//! Auth error types.

/// Errors that can occur during credential operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint rejected the exchange.
    #[error("credential exchange rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error description from the response body.
        message: String,
    },

    /// Application identity is not configured.
    #[error("client id and client secret must be configured")]
    MissingIdentity,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display() {
        let err = AuthError::Rejected {
            status: 403,
            message: "invalid client".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "credential exchange rejected (403): invalid client"
        );
    }

    #[test]
    fn missing_identity_display() {
        let err = AuthError::MissingIdentity;
        assert!(err.to_string().contains("client id"));
    }
}
