//! # startgate-core
//!
//! Shared building blocks for the startgate rendezvous protocol:
//!
//! - **Constants** — the well-known port, read size, message ceiling and exit codes
//! - **Messages** — [`ControlMessage`], the only token with protocol meaning is `start`
//! - **Addresses** — [`WorkerAddress`], a network prefix joined with a host id
//! - **Wire** — [`wire::send`] / [`wire::receive`], one unframed chunk per call

#![deny(unsafe_code)]

pub mod address;
pub mod errors;
pub mod message;
pub mod wire;

pub use address::{WorkerAddress, parse_host_list};
pub use errors::WireError;
pub use message::ControlMessage;

/// Well-known TCP port used by both the listener and the dispatcher.
pub const START_PORT: u16 = 50_000;

/// Maximum number of bytes consumed by a single receive.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Non-matching messages a listener tolerates before releasing anyway.
pub const DEFAULT_MESSAGE_CEILING: u32 = 5;

/// Exit status of a listener stopped by SIGTERM (128 + 15).
pub const TERMINATED_EXIT_CODE: u8 = 143;

/// Exit status of a listener that could not bind its port.
pub const BIND_ERROR_EXIT_CODE: u8 = 3;

/// Exit status of a dispatch where at least one worker was not reached.
pub const DISPATCH_FAILED_EXIT_CODE: u8 = 1;
