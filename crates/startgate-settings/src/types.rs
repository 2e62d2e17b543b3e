//! Settings types for both sides of the rendezvous.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use startgate_core::{DEFAULT_MESSAGE_CEILING, START_PORT};
use startgate_logging::LogFormat;

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartgateSettings {
    /// Worker-side listener settings.
    pub listener: ListenerSettings,
    /// Controller-side dispatch settings.
    pub dispatch: DispatchSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl StartgateSettings {
    /// Reject values that would make either side misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.listener.message_ceiling == 0 {
            return Err(SettingsError::InvalidValue(
                "listener.messageCeiling must be at least 1".into(),
            ));
        }
        if self.dispatch.max_concurrency == Some(0) {
            return Err(SettingsError::InvalidValue(
                "dispatch.maxConcurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Listener bind and timeout settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// How long to wait for the controller to connect, in seconds.
    pub idle_timeout_secs: u64,
    /// Non-matching messages tolerated before releasing anyway.
    pub message_ceiling: u32,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: START_PORT,
            idle_timeout_secs: 60,
            message_ceiling: DEFAULT_MESSAGE_CEILING,
        }
    }
}

/// Dispatcher fan-out settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DispatchSettings {
    /// Port every worker listens on.
    pub port: u16,
    /// Upper bound on concurrent connection attempts. `None` uses the host's
    /// available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Connect timeout per worker, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            port: START_PORT,
            max_concurrency: None,
            connect_timeout_ms: 10_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Per-module levels, e.g. `{"startgate_listener": "debug"}`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            modules: BTreeMap::new(),
        }
    }
}
