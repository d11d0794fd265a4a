use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use tether_core::OutboundSignal;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Serializes outbound signals into JSON frames for whatever socket writer
/// drains the receiving end.
#[derive(Clone)]
pub struct FrameSignaling {
    tx: mpsc::UnboundedSender<String>,
}

impl FrameSignaling {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SignalingOutput for FrameSignaling {
    async fn send(&self, signal: OutboundSignal) {
        match signal.to_frame() {
            Ok(frame) => {
                debug!("Emitting frame to {:?}", signal.recipient());
                if self.tx.send(frame).is_err() {
                    warn!("Signaling writer is gone; dropping frame for {:?}", signal.recipient());
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }
}
