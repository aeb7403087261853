//! Service-level error type.

use vigil_auth::AuthError;
use vigil_eventsub::EventSubError;
use vigil_store::StoreError;

/// Fatal errors that end the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Credential acquisition failed at startup.
    #[error("auth: {0}")]
    Auth(#[from] AuthError),

    /// The monitor set could not be loaded.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// The session loop failed terminally.
    #[error("eventsub: {0}")]
    EventSub(#[from] EventSubError),

    /// A supervised task ended abnormally.
    #[error("task failed: {0}")]
    Task(String),
}
