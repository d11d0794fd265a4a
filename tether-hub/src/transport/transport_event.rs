use bytes::Bytes;
use std::sync::Arc;
use tether_core::{IceCandidate, RemoteId};
use tokio::sync::mpsc;

use crate::transport::DataChannel;

/// ICE connectivity as reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Something a transport reported on its own, stamped with the record it belongs to.
pub struct TransportEvent {
    pub remote_id: RemoteId,
    /// Generation of the record that owns the transport. Events from a
    /// replaced transport carry an older epoch and are ignored.
    pub epoch: u64,
    pub kind: TransportEventKind,
}

pub enum TransportEventKind {
    ConnectivityChanged(ConnectivityState),

    /// A data channel opened, either announced by the remote or created locally.
    DataChannelOpen(Arc<dyn DataChannel>),

    DataChannelClosed,

    Message(Bytes),

    /// A local candidate was discovered and has to be forwarded to the remote.
    CandidateGenerated(IceCandidate),
}

/// Sink handed to a transport at creation. Everything it reports is funneled
/// into the hub's single event stream.
#[derive(Clone)]
pub struct TransportEvents {
    remote_id: RemoteId,
    epoch: u64,
    tx: mpsc::Sender<TransportEvent>,
}

impl TransportEvents {
    pub fn new(remote_id: RemoteId, epoch: u64, tx: mpsc::Sender<TransportEvent>) -> Self {
        Self { remote_id, epoch, tx }
    }

    pub fn remote_id(&self) -> &RemoteId {
        &self.remote_id
    }

    pub async fn emit(&self, kind: TransportEventKind) {
        let event = TransportEvent {
            remote_id: self.remote_id.clone(),
            epoch: self.epoch,
            kind,
        };
        // The hub is gone when this fails; nobody is left to tell.
        let _ = self.tx.send(event).await;
    }
}
