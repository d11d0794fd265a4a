use crate::error::NegotiationError;
use serde::Serialize;
use std::fmt;

/// Where one remote's negotiation stands.
///
/// Moves forward only. `Connected` and `Degraded` may alternate while the
/// transport flaps; `Failed` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegotiationState {
    Idle,
    OfferCreated,
    OfferReceived,
    DescriptionSet,
    Connected,
    Degraded,
    Failed,
    Closed,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Failed | NegotiationState::Closed)
    }

    fn rank(self) -> u8 {
        match self {
            NegotiationState::Idle => 0,
            NegotiationState::OfferCreated | NegotiationState::OfferReceived => 1,
            NegotiationState::DescriptionSet => 2,
            NegotiationState::Connected | NegotiationState::Degraded => 3,
            NegotiationState::Failed | NegotiationState::Closed => 4,
        }
    }

    pub fn can_transition_to(self, next: NegotiationState) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        next.rank() > self.rank() || (next.rank() == 3 && self.rank() == 3)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why a connection record left the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// `counter-left` from the signaling bus.
    Left,
    /// The same remote joined again and got a fresh record.
    Replaced,
    TransportUnavailable(NegotiationError),
    Failed(NegotiationError),
    /// Connectivity kept failing after the automatic restart.
    ConnectivityLost,
    /// The transport closed on its own.
    TransportClosed,
    Shutdown,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Left => write!(f, "remote left"),
            RemovalReason::Replaced => write!(f, "replaced by a new join"),
            RemovalReason::TransportUnavailable(e) => write!(f, "{e}"),
            RemovalReason::Failed(e) => write!(f, "negotiation failed: {e}"),
            RemovalReason::ConnectivityLost => write!(f, "connectivity lost"),
            RemovalReason::TransportClosed => write!(f, "transport closed"),
            RemovalReason::Shutdown => write!(f, "hub shut down"),
        }
    }
}
