//! # startgate-logging
//!
//! Installs the global `tracing` subscriber. Output goes to stdout, as JSON
//! by default so container log collectors can index the structured fields
//! (`address`, `port`, `state`, ...). `RUST_LOG` overrides the configured
//! directives when set.

#![deny(unsafe_code)]

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the stdout log layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable single-line records.
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Configuration for the logging subsystem.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Default log level. Overridden by `RUST_LOG`.
    pub level: Level,
    /// Per-module level overrides (e.g. `startgate_listener` => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            module_levels: Vec::new(),
            format: LogFormat::Json,
        }
    }
}

/// Render the filter directive string for `config`.
pub fn build_filter(config: &LoggingConfig) -> String {
    let mut filter = config.level.to_string().to_lowercase();
    for (module, level) in &config.module_levels {
        filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
    }
    filter
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(build_filter(config)));

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}
