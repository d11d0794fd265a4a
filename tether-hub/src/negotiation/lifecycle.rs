use crate::error::NegotiationError;
use crate::negotiation::ConnectionRecord;
use crate::signaling::IceServerProvider;
use crate::transport::{
    Transport, TransportConfig, TransportEvent, TransportEvents, TransportFactory,
};
use std::sync::Arc;
use tether_core::RemoteId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The only place transports are created and destroyed.
#[derive(Clone)]
pub struct LifecycleManager {
    factory: Arc<dyn TransportFactory>,
    ice_servers: Arc<dyn IceServerProvider>,
    events: mpsc::Sender<TransportEvent>,
}

impl LifecycleManager {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        ice_servers: Arc<dyn IceServerProvider>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Self {
        Self {
            factory,
            ice_servers,
            events,
        }
    }

    pub(crate) fn set_factory(&mut self, factory: Arc<dyn TransportFactory>) {
        self.factory = factory;
    }

    pub(crate) fn set_ice_servers(&mut self, ice_servers: Arc<dyn IceServerProvider>) {
        self.ice_servers = ice_servers;
    }

    /// Build a transport for `remote_id` whose connectivity, data channel and
    /// local candidate observers feed the hub's event stream.
    pub async fn open(
        &self,
        remote_id: RemoteId,
        epoch: u64,
    ) -> Result<Arc<dyn Transport>, NegotiationError> {
        let ice_servers = self
            .ice_servers
            .ice_servers()
            .await
            .map_err(|e| NegotiationError::TransportUnavailable(e.to_string()))?;

        info!(
            "Creating transport for {} with {} ICE server(s)",
            remote_id,
            ice_servers.len()
        );

        self.factory
            .create(
                TransportConfig { ice_servers },
                TransportEvents::new(remote_id, epoch, self.events.clone()),
            )
            .await
            .map_err(|e| NegotiationError::TransportUnavailable(format!("{e:#}")))
    }

    /// Cancel the record's pending work, close its data channel and transport.
    /// Safe to call more than once.
    pub fn release(&self, record: &mut ConnectionRecord) {
        let remote_id = record.remote_id().clone();
        let Some((transport, data_channel)) = record.release() else {
            debug!("Record for {} already released", remote_id);
            return;
        };

        tokio::spawn(async move {
            if let Some(channel) = data_channel {
                if let Err(e) = channel.close().await {
                    warn!("Failed to close data channel for {}: {:#}", remote_id, e);
                }
            }
            if let Some(transport) = transport {
                if let Err(e) = transport.close().await {
                    warn!("Failed to close transport for {}: {:#}", remote_id, e);
                }
            }
            debug!("Released transport for {}", remote_id);
        });
    }
}
