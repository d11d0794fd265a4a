use crate::negotiation::{NegotiationState, RemovalReason};
use bytes::Bytes;
use tether_core::RemoteId;

/// Notifications emitted after each transition.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    RemoteJoined {
        remote_id: RemoteId,
    },
    StateChanged {
        remote_id: RemoteId,
        from: NegotiationState,
        to: NegotiationState,
    },
    DataChannelOpen {
        remote_id: RemoteId,
        label: String,
    },
    DataChannelClosed {
        remote_id: RemoteId,
    },
    Message {
        remote_id: RemoteId,
        data: Bytes,
    },
    /// A signaling message was refused without touching the record.
    SignalRejected {
        remote_id: RemoteId,
        event: &'static str,
        reason: String,
    },
    RemoteRemoved {
        remote_id: RemoteId,
        reason: RemovalReason,
    },
    SessionError {
        message: String,
    },
}

impl HubEvent {
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            HubEvent::RemoteJoined { remote_id }
            | HubEvent::StateChanged { remote_id, .. }
            | HubEvent::DataChannelOpen { remote_id, .. }
            | HubEvent::DataChannelClosed { remote_id }
            | HubEvent::Message { remote_id, .. }
            | HubEvent::SignalRejected { remote_id, .. }
            | HubEvent::RemoteRemoved { remote_id, .. } => Some(remote_id),
            HubEvent::SessionError { .. } => None,
        }
    }
}
