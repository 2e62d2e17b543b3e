//! Termination signal handling.
//!
//! Handlers are installed before the listener binds, so a SIGTERM delivered
//! any time after the "listening" log line cancels the session instead of
//! killing the process with its sockets still open.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Installed handlers for SIGTERM and SIGINT.
pub struct TerminationSignals {
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
}

impl TerminationSignals {
    /// Register the handlers. Must be called from within a tokio runtime.
    pub fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let register = |kind: SignalKind, name: &str| match signal(kind) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(signal = name, error = %e, "failed to install signal handler");
                    None
                }
            };
            Self {
                terminate: register(SignalKind::terminate(), "SIGTERM"),
                interrupt: register(SignalKind::interrupt(), "SIGINT"),
            }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Resolve with the name of the first signal received.
    #[cfg(unix)]
    pub async fn recv(mut self) -> &'static str {
        async fn next(signal: Option<&mut tokio::signal::unix::Signal>) {
            match signal {
                Some(s) => delivered(s.recv()).await,
                None => std::future::pending().await,
            }
        }

        tokio::select! {
            () = next(self.terminate.as_mut()) => "SIGTERM",
            () = next(self.interrupt.as_mut()) => "SIGINT",
        }
    }

    /// Resolve with the name of the first signal received.
    #[cfg(not(unix))]
    pub async fn recv(self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "CTRL_C"
    }

    /// Cancel `cancel` when a signal arrives.
    pub fn cancel_on_signal(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let signal = self.recv().await;
            info!(signal, "termination signal received");
            cancel.cancel();
        })
    }
}

/// Resolves once `delivery` yields a signal. A closed stream (`None`) never
/// resolves, so only a real signal can terminate the listener.
#[cfg(unix)]
async fn delivered<F>(delivery: F)
where
    F: Future<Output = Option<()>>,
{
    if delivery.await.is_none() {
        std::future::pending::<()>().await;
    }
}
