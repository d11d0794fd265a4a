use crate::config::HubConfig;
use crate::hub::{HubContext, HubEvent, HubObserver};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Human-readable trail of what the hub did, newest last.
///
/// Keeps at most `capacity` lines; older ones fall off the front.
#[derive(Clone)]
pub struct DiagnosticsLog {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl DiagnosticsLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Sized by `diagnostics_capacity`.
    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(config.diagnostics_capacity)
    }

    pub async fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().await;
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.lines.lock().await.clear();
    }
}

#[async_trait]
impl HubObserver for DiagnosticsLog {
    async fn on_event(&self, _ctx: &HubContext, event: HubEvent) {
        self.push(describe(&event)).await;
    }
}

fn describe(event: &HubEvent) -> String {
    match event {
        HubEvent::RemoteJoined { remote_id } => format!("{remote_id} joined"),
        HubEvent::StateChanged {
            remote_id,
            from,
            to,
        } => format!("{remote_id}: {from} -> {to}"),
        HubEvent::DataChannelOpen { remote_id, label } => {
            format!("{remote_id}: data channel '{label}' open")
        }
        HubEvent::DataChannelClosed { remote_id } => format!("{remote_id}: data channel closed"),
        HubEvent::Message { remote_id, data } => {
            format!("{remote_id}: message ({} bytes)", data.len())
        }
        HubEvent::SignalRejected {
            remote_id,
            event,
            reason,
        } => format!("{remote_id}: rejected {event}: {reason}"),
        HubEvent::RemoteRemoved { remote_id, reason } => {
            format!("{remote_id} removed: {reason}")
        }
        HubEvent::SessionError { message } => format!("session error: {message}"),
    }
}
