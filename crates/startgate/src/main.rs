//! # startgate
//!
//! `startgate listen` blocks a worker until the controller's `start` token
//! arrives (or the idle timeout passes); `startgate dispatch` sends that token
//! to the whole fleet.

#![deny(unsafe_code)]

mod cli;
mod commands;
mod shutdown;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use startgate_logging::{LoggingConfig, init_logging};
use startgate_settings::{LoggingSettings, StartgateSettings};
use tracing::Level;

use crate::cli::{Cli, Command};

fn load_settings(cli: &Cli) -> Result<StartgateSettings> {
    match &cli.settings {
        Some(path) => startgate_settings::load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => startgate_settings::load_settings().context("failed to load settings"),
    }
}

/// Build the subscriber config. Unparseable levels fall back (the default
/// level to INFO, module entries are dropped) and are returned as
/// `key=value` strings so they can be reported once logging is up.
fn logging_config(settings: &LoggingSettings) -> (LoggingConfig, Vec<String>) {
    let mut ignored = Vec::new();

    let level = settings.level.parse().unwrap_or_else(|_| {
        ignored.push(format!("logging.level={}", settings.level));
        Level::INFO
    });

    let mut module_levels = Vec::with_capacity(settings.modules.len());
    for (module, value) in &settings.modules {
        match value.parse() {
            Ok(level) => module_levels.push((module.clone(), level)),
            Err(_) => ignored.push(format!("logging.modules.{module}={value}")),
        }
    }

    let config = LoggingConfig {
        level,
        module_levels,
        format: settings.format,
    };
    (config, ignored)
}

async fn run(cli: Cli, settings: StartgateSettings) -> Result<u8> {
    let code = match cli.command {
        Command::Listen(args) => {
            let config = args.into_config(settings.listener)?;
            commands::listen(config).await
        }
        Command::Dispatch(args) => {
            let config = args.to_config(settings.dispatch);
            commands::dispatch(&args.network_prefix, &args.host_ids, config).await
        }
    };
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("startgate: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    let (logging, ignored) = logging_config(&settings.logging);
    init_logging(&logging);
    for setting in &ignored {
        tracing::warn!(setting = %setting, "invalid log level, ignoring");
    }

    match run(cli, settings).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "startgate failed");
            ExitCode::FAILURE
        }
    }
}
