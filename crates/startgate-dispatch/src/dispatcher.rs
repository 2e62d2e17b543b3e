//! Concurrent fan-out of the start signal.
//!
//! One tokio task per worker address, bounded by a semaphore sized to the
//! host's available parallelism. Every task runs to completion and its
//! result is collected; a failure on one address never stops the others.
//! Delivery is fire-and-forget: success means the token was written, not
//! that the listener consumed it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use startgate_core::{ControlMessage, START_PORT, WorkerAddress, wire};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpSocket;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::report::{DispatchOutcome, DispatchReport};

/// Dispatcher configuration.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Port every worker listens on.
    pub port: u16,
    /// Upper bound on in-flight connection attempts.
    pub max_concurrency: usize,
    /// Per-address connect timeout. `None` leaves it to the OS.
    pub connect_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            port: START_PORT,
            max_concurrency: default_concurrency(),
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Available parallelism of this host, at least 1.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Sends the start signal to a fixed set of workers.
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Send `start` to `prefix.host_id` for every host id.
    ///
    /// Each address is attempted exactly once. Returns after every attempt
    /// has finished, with outcomes in input order.
    pub async fn dispatch<S: AsRef<str>>(&self, prefix: &str, host_ids: &[S]) -> DispatchReport {
        let addresses = WorkerAddress::for_hosts(prefix, host_ids);
        if addresses.is_empty() {
            warn!(prefix, "no worker addresses to dispatch to");
            return DispatchReport::default();
        }

        let concurrency = self.config.max_concurrency.max(1);
        info!(
            workers = addresses.len(),
            port = self.config.port,
            concurrency,
            "sending start signal"
        );

        let limit = Arc::new(Semaphore::new(concurrency));
        let config = Arc::new(self.config.clone());
        let handles: Vec<_> = addresses
            .iter()
            .cloned()
            .map(|address| {
                let limit = Arc::clone(&limit);
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    // The semaphore is never closed, so acquire cannot fail.
                    let _permit = limit.acquire().await;
                    let result = send_start(&address, &config).await;
                    match &result {
                        Ok(target) => info!(%address, %target, "start signal sent"),
                        Err(e) => warn!(
                            %address,
                            error = %e,
                            error_kind = e.error_kind(),
                            "start signal not delivered"
                        ),
                    }
                    result
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(addresses.len());
        for (address, handle) in addresses.into_iter().zip(handles) {
            let result = handle.await.unwrap_or_else(|e| {
                warn!(%address, error = %e, "dispatch task failed");
                Err(DispatchError::Task {
                    address: address.host(),
                    reason: e.to_string(),
                })
            });
            outcomes.push(DispatchOutcome { address, result });
        }

        let report = DispatchReport { outcomes };
        info!(
            sent = report.succeeded(),
            failed = report.failed(),
            total = report.len(),
            "dispatch complete"
        );
        report
    }
}

/// Dispatch with default configuration, failing if any worker was missed.
pub async fn dispatch<S: AsRef<str>>(
    prefix: &str,
    host_ids: &[S],
) -> Result<DispatchReport, DispatchError> {
    Dispatcher::default()
        .dispatch(prefix, host_ids)
        .await
        .into_result()
}

/// Deliver the start token to one worker: connect, send, close.
pub async fn send_start(
    address: &WorkerAddress,
    config: &DispatchConfig,
) -> Result<SocketAddr, DispatchError> {
    let host = address.host();
    let target = resolve(&host, config.port).await?;

    let socket = if target.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .and_then(|s| s.set_reuseaddr(true).map(|()| s))
    .map_err(|source| DispatchError::Connect {
        address: host.clone(),
        source,
    })?;

    let connect = socket.connect(target);
    let connected = match config.connect_timeout {
        Some(timeout) => tokio::time::timeout(timeout, connect).await.map_err(|_| {
            DispatchError::ConnectTimeout {
                address: host.clone(),
                timeout,
            }
        })?,
        None => connect.await,
    };
    let mut stream = connected.map_err(|source| DispatchError::Connect {
        address: host.clone(),
        source,
    })?;

    wire::send(&mut stream, ControlMessage::Start.as_str())
        .await
        .map_err(|source| DispatchError::Send {
            address: host.clone(),
            source,
        })?;

    // The token is already written; a failed FIN only affects the close.
    if let Err(e) = stream.shutdown().await {
        debug!(address = %host, error = %e, "shutdown after send failed");
    }
    Ok(target)
}

/// Resolve `host:port`, preferring an IPv4 address.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, DispatchError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| DispatchError::Resolve {
            address: host.to_string(),
            source,
        })?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| DispatchError::Unresolvable {
            address: host.to_string(),
        })
}
