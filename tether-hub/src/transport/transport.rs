use crate::transport::{TransportConfig, TransportEvents};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tether_core::{IceCandidate, SessionDescription};

/// Native connection handle for one remote.
///
/// Owned by the hub's lifecycle manager; nothing else opens or closes it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Restart connectivity checks in place.
    ///
    /// Returns a fresh local offer when the remote has to see one to follow the restart.
    async fn restart_connectivity(&self) -> Result<Option<SessionDescription>>;

    /// Create a data channel from this side. Its opening is reported as
    /// [`TransportEventKind::DataChannelOpen`](crate::transport::TransportEventKind::DataChannelOpen).
    async fn open_data_channel(&self, label: &str) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;

    async fn send(&self, data: &Bytes) -> Result<usize>;

    async fn close(&self) -> Result<()>;
}

/// Builds transports and wires their observers into the hub's event stream.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        config: TransportConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn Transport>>;
}
