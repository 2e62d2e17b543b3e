use std::time::Duration;

use startgate_core::WireError;

use crate::report::DispatchReport;

/// Failure to deliver the start signal, per address or in aggregate.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Name resolution failed.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        /// Worker host that was looked up.
        address: String,
        /// Resolver error.
        #[source]
        source: std::io::Error,
    },

    /// Name resolution returned no addresses.
    #[error("{address} resolved to no addresses")]
    Unresolvable {
        /// Worker host that was looked up.
        address: String,
    },

    /// The connection was refused or the host unreachable.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// Worker host.
        address: String,
        /// Connect error.
        #[source]
        source: std::io::Error,
    },

    /// The connect attempt did not finish in time.
    #[error("connect to {address} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Worker host.
        address: String,
        /// Configured connect timeout.
        timeout: Duration,
    },

    /// Writing the start token failed after connecting.
    #[error("failed to send start to {address}: {source}")]
    Send {
        /// Worker host.
        address: String,
        /// Wire error.
        #[source]
        source: WireError,
    },

    /// The task delivering to this address panicked.
    #[error("dispatch task for {address} failed: {reason}")]
    Task {
        /// Worker host.
        address: String,
        /// Join error text.
        reason: String,
    },

    /// At least one address was not reached. Carries every outcome, so the
    /// caller still learns which workers did receive the token.
    #[error(
        "start signal not delivered to {} of {} workers",
        .report.failed(),
        .report.len()
    )]
    Incomplete {
        /// Per-address outcomes, in input order.
        report: Box<DispatchReport>,
    },
}

impl DispatchError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Resolve { .. } | Self::Unresolvable { .. } => "resolve_failed",
            Self::Connect { .. } => "connect_failed",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Send { .. } => "send_failed",
            Self::Task { .. } => "task_failed",
            Self::Incomplete { .. } => "incomplete",
        }
    }
}
