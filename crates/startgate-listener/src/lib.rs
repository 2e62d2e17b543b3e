//! # startgate-listener
//!
//! Worker-side half of the start rendezvous. A [`ListenerSession`] binds the
//! well-known port, accepts exactly one connection and reads until it sees
//! the `start` token or the non-matching message ceiling. An idle timeout and
//! a cancellation token bound the wait; every path releases the caller.

#![deny(unsafe_code)]

pub mod error;
pub mod session;
pub mod state;

pub use error::ListenerError;
pub use session::{ListenerConfig, ListenerSession};
pub use state::{ListenerEvent, ListenerOutcome, ListenerState, ReleaseReason};
