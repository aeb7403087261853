//! Settings error types.

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Config file exists but could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file contains invalid JSON or mismatched types.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for settings results.
pub type Result<T> = std::result::Result<T, SettingsError>;
