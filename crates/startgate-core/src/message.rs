//! Control messages exchanged between dispatcher and listener.

use std::fmt;

/// A decoded message received from (or sent to) a peer.
///
/// The protocol has exactly one meaningful value, [`ControlMessage::Start`].
/// Anything else is carried verbatim as [`ControlMessage::Other`] so it can be
/// logged and counted against the listener's ceiling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    /// The literal token `start`.
    Start,
    /// Any other text.
    Other(String),
}

impl ControlMessage {
    /// Wire form of [`ControlMessage::Start`].
    pub const START_TOKEN: &'static str = "start";

    /// Classify received text. Only an exact match of `start` is a start signal.
    pub fn decode(text: &str) -> Self {
        if text == Self::START_TOKEN {
            Self::Start
        } else {
            Self::Other(text.to_string())
        }
    }

    /// Text form sent on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Start => Self::START_TOKEN,
            Self::Other(text) => text,
        }
    }

    /// Whether this is the start signal.
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
