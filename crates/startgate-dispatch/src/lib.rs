//! # startgate-dispatch
//!
//! Controller-side half of the start rendezvous: open one connection per
//! worker, write the `start` token, close. Attempts run concurrently and
//! every per-address outcome is reported.

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod error;
pub mod report;

pub use dispatcher::{DispatchConfig, Dispatcher, default_concurrency, dispatch, send_start};
pub use error::DispatchError;
pub use report::{DispatchOutcome, DispatchReport};
