use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use startgate_dispatch::{DispatchConfig, default_concurrency};
use startgate_listener::ListenerConfig;
use startgate_settings::{DispatchSettings, ListenerSettings};

/// Synchronized start signal for a fleet of load-test workers.
#[derive(Parser, Debug)]
#[command(name = "startgate", version, about)]
pub struct Cli {
    /// Path to a JSON settings file (default: `~/.startgate/settings.json`).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait on this worker until the controller sends `start`.
    Listen(ListenArgs),
    /// Send `start` to every worker.
    Dispatch(DispatchArgs),
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Seconds to wait for the controller before starting anyway.
    pub timeout_secs: Option<u64>,

    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (0 picks a free port).
    #[arg(long)]
    pub port: Option<u16>,

    /// Non-matching messages tolerated before releasing.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub ceiling: Option<u32>,
}

impl ListenArgs {
    /// Merge flags over settings and build the listener config.
    pub fn into_config(self, mut settings: ListenerSettings) -> Result<ListenerConfig> {
        if let Some(v) = self.timeout_secs {
            settings.idle_timeout_secs = v;
        }
        if let Some(v) = self.host {
            settings.host = v;
        }
        if let Some(v) = self.port {
            settings.port = v;
        }
        if let Some(v) = self.ceiling {
            settings.message_ceiling = v;
        }

        let ip: IpAddr = settings
            .host
            .parse()
            .with_context(|| format!("invalid listen host: {}", settings.host))?;
        Ok(ListenerConfig {
            bind_addr: SocketAddr::new(ip, settings.port),
            idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
            message_ceiling: settings.message_ceiling,
        })
    }
}

#[derive(Args, Debug)]
pub struct DispatchArgs {
    /// Network prefix shared by the workers, e.g. `10.0`.
    pub network_prefix: String,

    /// Comma-delimited host ids appended to the prefix, e.g. `1.5,1.6`.
    pub host_ids: String,

    /// Port the workers listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Maximum concurrent connection attempts.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,

    /// Per-worker connect timeout in milliseconds.
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,
}

impl DispatchArgs {
    /// Merge flags over settings and build the dispatcher config.
    pub fn to_config(&self, mut settings: DispatchSettings) -> DispatchConfig {
        if let Some(v) = self.port {
            settings.port = v;
        }
        if let Some(v) = self.concurrency {
            settings.max_concurrency = usize::try_from(v).ok();
        }
        if let Some(v) = self.connect_timeout_ms {
            settings.connect_timeout_ms = v;
        }

        DispatchConfig {
            port: settings.port,
            max_concurrency: settings.max_concurrency.unwrap_or_else(default_concurrency),
            connect_timeout: (settings.connect_timeout_ms > 0)
                .then(|| Duration::from_millis(settings.connect_timeout_ms)),
        }
    }
}
