use std::net::SocketAddr;

use startgate_core::BIND_ERROR_EXIT_CODE;

/// Errors raised by a listener session.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The port is already in use or the address is unavailable.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Accepting the controller connection failed for a reason other than the idle timeout.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// Creating or configuring the socket failed.
    #[error("socket setup failed: {0}")]
    Socket(#[source] std::io::Error),

    /// An event was applied to a state that does not accept it.
    #[error("invalid transition: {event} while {state}")]
    InvalidTransition {
        /// Name of the current state.
        state: &'static str,
        /// Name of the rejected event.
        event: &'static str,
    },
}

impl ListenerError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Bind { .. } => BIND_ERROR_EXIT_CODE,
            _ => 1,
        }
    }
}
