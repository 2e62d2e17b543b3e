//! Listener state machine.
//!
//! ```text
//! Idle ─Bound─▶ Bound ─Listening─▶ AwaitingConnection ─Accepted─▶ ConnectedReading
//!                                        │                          │   ▲ non-matching
//!                                  AcceptTimedOut                   │   └──(below ceiling)
//!                                        ▼                          ▼
//!                                    TimedOut                    Released(reason)
//!
//! any non-terminal state ─TerminationRequested─▶ Terminated
//! ```
//!
//! [`ListenerState::transition`] is pure: the session performs the I/O and
//! feeds the resulting [`ListenerEvent`] back in.

use std::fmt;

use startgate_core::{ControlMessage, TERMINATED_EXIT_CODE};

use crate::error::ListenerError;

/// Why a connected listener released its caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseReason {
    /// The peer sent the start token.
    StartReceived,
    /// The non-matching message ceiling was reached.
    CeilingReached,
    /// The peer closed the connection before sending the start token.
    PeerClosed,
    /// A hard read error occurred on the connection.
    ReadFailed,
}

impl ReleaseReason {
    /// Short name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartReceived => "start_received",
            Self::CeilingReached => "ceiling_reached",
            Self::PeerClosed => "peer_closed",
            Self::ReadFailed => "read_failed",
        }
    }
}

/// States of one listener session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerState {
    /// Socket created, not yet bound.
    Idle,
    /// Bound to the port with address reuse enabled.
    Bound,
    /// Listening with a backlog of one, waiting for the controller.
    AwaitingConnection,
    /// A peer is connected; `non_matching` messages have been seen so far.
    ConnectedReading {
        /// Non-start messages received on this connection.
        non_matching: u32,
    },
    /// Terminal: the caller may proceed.
    Released(ReleaseReason),
    /// Terminal: nobody connected within the idle timeout. Also a release.
    TimedOut,
    /// Terminal: an external termination request arrived.
    Terminated,
}

/// Inputs to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerEvent {
    /// The socket was bound.
    Bound,
    /// The socket started listening.
    Listening,
    /// A peer connected.
    Accepted,
    /// The idle timeout elapsed before any peer connected.
    AcceptTimedOut,
    /// A message arrived on the connection.
    Message(ControlMessage),
    /// The peer closed the connection.
    PeerClosed,
    /// Reading from the connection failed.
    ReadFailed,
    /// Termination was requested (SIGTERM or cancellation).
    TerminationRequested,
}

impl ListenerEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Bound => "bound",
            Self::Listening => "listening",
            Self::Accepted => "accepted",
            Self::AcceptTimedOut => "accept_timed_out",
            Self::Message(_) => "message",
            Self::PeerClosed => "peer_closed",
            Self::ReadFailed => "read_failed",
            Self::TerminationRequested => "termination_requested",
        }
    }
}

/// Terminal result of a session, as seen by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// A peer connected and the session released.
    Released(ReleaseReason),
    /// No peer connected in time; the caller proceeds anyway.
    TimedOut,
    /// Stopped by an external termination request.
    Terminated,
}

impl ListenerOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Released(_) | Self::TimedOut => 0,
            Self::Terminated => TERMINATED_EXIT_CODE,
        }
    }
}

impl ListenerState {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Bound => "bound",
            Self::AwaitingConnection => "awaiting_connection",
            Self::ConnectedReading { .. } => "connected_reading",
            Self::Released(_) => "released",
            Self::TimedOut => "timed_out",
            Self::Terminated => "terminated",
        }
    }

    /// Whether no further events are accepted.
    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// The caller-facing outcome of a terminal state.
    pub fn outcome(&self) -> Option<ListenerOutcome> {
        match *self {
            Self::Released(reason) => Some(ListenerOutcome::Released(reason)),
            Self::TimedOut => Some(ListenerOutcome::TimedOut),
            Self::Terminated => Some(ListenerOutcome::Terminated),
            _ => None,
        }
    }

    /// Apply `event`. `ceiling` is the number of non-matching messages after
    /// which a connected listener releases anyway.
    pub fn transition(self, event: &ListenerEvent, ceiling: u32) -> Result<Self, ListenerError> {
        let next = match (self, event) {
            (s, ListenerEvent::TerminationRequested) if !s.is_terminal() => Self::Terminated,

            (Self::Idle, ListenerEvent::Bound) => Self::Bound,
            (Self::Bound, ListenerEvent::Listening) => Self::AwaitingConnection,

            (Self::AwaitingConnection, ListenerEvent::Accepted) => {
                Self::ConnectedReading { non_matching: 0 }
            }
            (Self::AwaitingConnection, ListenerEvent::AcceptTimedOut) => Self::TimedOut,

            (Self::ConnectedReading { non_matching }, ListenerEvent::Message(msg)) => {
                if msg.is_start() {
                    Self::Released(ReleaseReason::StartReceived)
                } else if non_matching + 1 >= ceiling {
                    Self::Released(ReleaseReason::CeilingReached)
                } else {
                    Self::ConnectedReading {
                        non_matching: non_matching + 1,
                    }
                }
            }
            (Self::ConnectedReading { .. }, ListenerEvent::PeerClosed) => {
                Self::Released(ReleaseReason::PeerClosed)
            }
            (Self::ConnectedReading { .. }, ListenerEvent::ReadFailed) => {
                Self::Released(ReleaseReason::ReadFailed)
            }

            (state, event) => {
                return Err(ListenerError::InvalidTransition {
                    state: state.name(),
                    event: event.name(),
                });
            }
        };
        Ok(next)
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectedReading { non_matching } => {
                write!(f, "connected_reading({non_matching})")
            }
            Self::Released(reason) => write!(f, "released({})", reason.as_str()),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const CEILING: u32 = 5;

    fn other(text: &str) -> ListenerEvent {
        ListenerEvent::Message(ControlMessage::Other(text.into()))
    }

    fn connected() -> ListenerState {
        ListenerState::Idle
            .transition(&ListenerEvent::Bound, CEILING)
            .and_then(|s| s.transition(&ListenerEvent::Listening, CEILING))
            .and_then(|s| s.transition(&ListenerEvent::Accepted, CEILING))
            .unwrap()
    }

    #[test]
    fn setup_path_reaches_connected_reading() {
        assert_eq!(connected(), ListenerState::ConnectedReading { non_matching: 0 });
    }

    #[test]
    fn start_as_first_message_releases_immediately() {
        let next = connected()
            .transition(&ListenerEvent::Message(ControlMessage::Start), CEILING)
            .unwrap();
        assert_eq!(next, ListenerState::Released(ReleaseReason::StartReceived));
    }

    #[test]
    fn start_after_noise_releases() {
        let mut state = connected();
        for _ in 0..3 {
            state = state.transition(&other("ping"), CEILING).unwrap();
        }
        assert_eq!(state, ListenerState::ConnectedReading { non_matching: 3 });
        let next = state
            .transition(&ListenerEvent::Message(ControlMessage::Start), CEILING)
            .unwrap();
        assert_eq!(next, ListenerState::Released(ReleaseReason::StartReceived));
    }

    #[test]
    fn fifth_non_matching_message_releases() {
        let mut state = connected();
        for i in 1..CEILING {
            state = state.transition(&other("ping"), CEILING).unwrap();
            assert_eq!(state, ListenerState::ConnectedReading { non_matching: i });
        }
        let last = state.transition(&other("ping"), CEILING).unwrap();
        assert_eq!(last, ListenerState::Released(ReleaseReason::CeilingReached));
        assert!(last.is_terminal());
    }

    #[test]
    fn ceiling_of_one_releases_on_first_noise() {
        let next = connected().transition(&other("hello"), 1).unwrap();
        assert_eq!(next, ListenerState::Released(ReleaseReason::CeilingReached));
    }

    #[test]
    fn timeout_only_while_awaiting() {
        let awaiting = ListenerState::Bound
            .transition(&ListenerEvent::Listening, CEILING)
            .unwrap();
        assert_eq!(
            awaiting.transition(&ListenerEvent::AcceptTimedOut, CEILING).unwrap(),
            ListenerState::TimedOut
        );
        assert_matches!(
            connected().transition(&ListenerEvent::AcceptTimedOut, CEILING),
            Err(ListenerError::InvalidTransition { state: "connected_reading", .. })
        );
    }

    #[test]
    fn peer_close_and_read_failure_release() {
        assert_eq!(
            connected().transition(&ListenerEvent::PeerClosed, CEILING).unwrap(),
            ListenerState::Released(ReleaseReason::PeerClosed)
        );
        assert_eq!(
            connected().transition(&ListenerEvent::ReadFailed, CEILING).unwrap(),
            ListenerState::Released(ReleaseReason::ReadFailed)
        );
    }

    #[test]
    fn termination_preempts_every_non_terminal_state() {
        for state in [
            ListenerState::Idle,
            ListenerState::Bound,
            ListenerState::AwaitingConnection,
            ListenerState::ConnectedReading { non_matching: 2 },
        ] {
            assert_eq!(
                state.transition(&ListenerEvent::TerminationRequested, CEILING).unwrap(),
                ListenerState::Terminated
            );
        }
    }

    #[test]
    fn terminal_states_reject_events() {
        for state in [
            ListenerState::Released(ReleaseReason::StartReceived),
            ListenerState::TimedOut,
            ListenerState::Terminated,
        ] {
            assert_matches!(
                state.transition(&ListenerEvent::TerminationRequested, CEILING),
                Err(ListenerError::InvalidTransition { .. })
            );
            assert_matches!(
                state.transition(&other("ping"), CEILING),
                Err(ListenerError::InvalidTransition { .. })
            );
        }
    }

    #[test]
    fn outcomes_and_exit_codes() {
        assert_eq!(ListenerState::AwaitingConnection.outcome(), None);
        assert_eq!(
            ListenerState::TimedOut.outcome().map(ListenerOutcome::exit_code),
            Some(0)
        );
        assert_eq!(
            ListenerState::Released(ReleaseReason::CeilingReached)
                .outcome()
                .map(ListenerOutcome::exit_code),
            Some(0)
        );
        assert_eq!(ListenerOutcome::Terminated.exit_code(), 143);
    }

    #[test]
    fn display_names() {
        assert_eq!(ListenerState::AwaitingConnection.to_string(), "awaiting_connection");
        assert_eq!(
            ListenerState::ConnectedReading { non_matching: 2 }.to_string(),
            "connected_reading(2)"
        );
        assert_eq!(
            ListenerState::Released(ReleaseReason::StartReceived).to_string(),
            "released(start_received)"
        );
    }
}
