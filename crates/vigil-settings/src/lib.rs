//! # vigil-settings
//!
//! Configuration for the vigil service.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If a JSON config file exists, its values override defaults
//!    (every field carries a serde default, so partial files work)
//! 3. Apply environment variable overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use loader::{load_settings, load_settings_from_path};
pub use types::{ServiceSettings, Settings, StoreSettings, TwitchSettings};
