use crate::error::HubError;
use crate::hub::{HubCommand, HubContext};
use tether_core::InboundSignal;
use tokio::sync::mpsc;

/// Cloneable entry point into a running hub.
#[derive(Clone)]
pub struct HubHandle {
    command_tx: mpsc::Sender<HubCommand>,
    context: HubContext,
}

impl HubHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<HubCommand>, context: HubContext) -> Self {
        Self {
            command_tx,
            context,
        }
    }

    pub async fn signal(&self, signal: InboundSignal) -> Result<(), HubError> {
        self.command(HubCommand::Signal(signal)).await
    }

    /// Decode a raw signaling frame and hand it to the hub.
    /// Malformed frames are reported here and never reach the hub.
    pub async fn deliver_frame(&self, frame: &str) -> Result<(), HubError> {
        let signal = InboundSignal::from_frame(frame)?;
        self.signal(signal).await
    }

    pub async fn create_session(&self, session_key: impl Into<String>) -> Result<(), HubError> {
        self.command(HubCommand::CreateSession {
            session_key: session_key.into(),
        })
        .await
    }

    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.command(HubCommand::Shutdown).await
    }

    pub fn context(&self) -> &HubContext {
        &self.context
    }

    async fn command(&self, cmd: HubCommand) -> Result<(), HubError> {
        self.command_tx.send(cmd).await.map_err(|_| HubError::Closed)
    }
}
