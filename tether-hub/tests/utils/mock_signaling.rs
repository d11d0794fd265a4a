use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tether_core::{IceCandidate, OutboundSignal, RemoteId, SessionDescription};
use tether_hub::signaling::SignalingOutput;
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures all outgoing signals.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured signals.
    tx: mpsc::UnboundedSender<OutboundSignal>,
    /// All captured signals (for verification).
    signals: Arc<Mutex<Vec<OutboundSignal>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            signals: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    pub async fn sent(&self) -> Vec<OutboundSignal> {
        self.signals.lock().await.clone()
    }

    pub async fn answers_for(&self, remote_id: &RemoteId) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                OutboundSignal::Answer { to, answer, .. } if to == remote_id => {
                    Some(answer.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub async fn offers_for(&self, remote_id: &RemoteId) -> Vec<SessionDescription> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                OutboundSignal::Offer { to, offer, .. } if to == remote_id => Some(offer.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn candidates_for(&self, remote_id: &RemoteId) -> Vec<IceCandidate> {
        self.signals
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                OutboundSignal::IceCandidate { to, candidate, .. } if to == remote_id => {
                    Some(candidate.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Poll the captured signals until one matches or the timeout expires.
    pub async fn wait_for<F>(&self, timeout_ms: u64, predicate: F) -> Option<OutboundSignal>
    where
        F: Fn(&OutboundSignal) -> bool,
    {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if let Some(found) = self.signals.lock().await.iter().find(|s| predicate(s)) {
                return Some(found.clone());
            }
            if Instant::now() > deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send(&self, signal: OutboundSignal) {
        tracing::debug!("[MockSignaling] send to {:?}", signal.recipient());

        self.signals.lock().await.push(signal.clone());
        let _ = self.tx.send(signal);
    }
}
