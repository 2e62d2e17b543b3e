//! Wire-level error types.

use thiserror::Error;

/// Failure while moving bytes over an established connection.
#[derive(Debug, Error)]
pub enum WireError {
    /// The underlying read or write failed (peer reset, broken pipe, ...).
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::BrokenPipe => "broken_pipe",
                std::io::ErrorKind::ConnectionReset => "connection_reset",
                std::io::ErrorKind::ConnectionAborted => "connection_aborted",
                std::io::ErrorKind::UnexpectedEof => "unexpected_eof",
                _ => "io",
            },
        }
    }
}
