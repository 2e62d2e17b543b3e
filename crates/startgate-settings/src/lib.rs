//! # startgate-settings
//!
//! Listener and dispatcher settings. Values come from compiled defaults, then
//! the optional `~/.startgate/settings.json`, then `STARTGATE_*` variables.
//! The binary applies its command-line flags last.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::{DispatchSettings, ListenerSettings, LoggingSettings, StartgateSettings};
