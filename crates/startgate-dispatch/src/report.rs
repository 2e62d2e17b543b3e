use std::net::SocketAddr;

use startgate_core::WorkerAddress;

use crate::error::DispatchError;

/// Result of delivering the start signal to one worker.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Worker the signal was addressed to.
    pub address: WorkerAddress,
    /// Socket address reached, or why delivery failed.
    pub result: Result<SocketAddr, DispatchError>,
}

impl DispatchOutcome {
    /// Whether the token was written to this worker.
    pub fn is_sent(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-address outcomes of one dispatch, in input order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// One entry per host id.
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    /// Number of addresses attempted.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether no address was attempted.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of addresses that received the token.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_sent()).count()
    }

    /// Number of addresses that were not reached.
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Whether every address received the token.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.is_sent())
    }

    /// Addresses that received the token.
    pub fn sent(&self) -> impl Iterator<Item = &WorkerAddress> {
        self.outcomes
            .iter()
            .filter(|o| o.is_sent())
            .map(|o| &o.address)
    }

    /// `Ok(self)` when every address was reached, otherwise
    /// [`DispatchError::Incomplete`] holding this report.
    pub fn into_result(self) -> Result<Self, DispatchError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DispatchError::Incomplete {
                report: Box::new(self),
            })
        }
    }
}
