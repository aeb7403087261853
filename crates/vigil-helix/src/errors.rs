//! Helix API error types.

/// Errors from the Helix API.
#[derive(Debug, thiserror::Error)]
pub enum HelixError {
    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Subscription create was not accepted (expects 202).
    #[error("subscription rejected ({status}): {message}")]
    SubscriptionRejected {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// A 202 response that did not carry a subscription id.
    #[error("subscription accepted but no id returned")]
    MissingSubscriptionId,

    /// Announcement send was not accepted (expects 204).
    #[error("announcement rejected ({status})")]
    AnnouncementRejected {
        /// HTTP status code.
        status: u16,
    },
}
