use crate::negotiation::NegotiationState;
use crate::transport::DataChannel;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tether_core::RemoteId;
use tracing::error;

/// Read-only view of the hub plus the data path to connected remotes.
/// Cheap to clone and safe to share across tasks; only the hub writes to it.
#[derive(Clone, Default)]
pub struct HubContext {
    states: Arc<DashMap<RemoteId, NegotiationState>>,
    channels: Arc<DashMap<RemoteId, Arc<dyn DataChannel>>>,
}

impl HubContext {
    pub(crate) fn set_state(&self, remote_id: &RemoteId, state: NegotiationState) {
        self.states.insert(remote_id.clone(), state);
    }

    pub(crate) fn attach_channel(&self, remote_id: &RemoteId, channel: Arc<dyn DataChannel>) {
        self.channels.insert(remote_id.clone(), channel);
    }

    pub(crate) fn detach_channel(&self, remote_id: &RemoteId) {
        self.channels.remove(remote_id);
    }

    pub(crate) fn forget(&self, remote_id: &RemoteId) {
        self.states.remove(remote_id);
        self.channels.remove(remote_id);
    }

    /// Send a binary message over the remote's data channel.
    /// Returns `false` when there is no open channel or the send failed.
    pub async fn send(&self, remote_id: &RemoteId, data: Bytes) -> bool {
        // Clone out so the map guard is not held across the await.
        let Some(channel) = self.channels.get(remote_id).map(|c| c.value().clone()) else {
            error!("Attempted to send message to {} without an open data channel", remote_id);
            return false;
        };

        match channel.send(&data).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to send message to {}: {:#}", remote_id, e);
                false
            }
        }
    }

    /// Send to every remote with an open data channel.
    pub async fn broadcast(&self, data: Bytes) {
        let channels: Vec<_> = self
            .channels
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        for (remote_id, channel) in channels {
            if let Err(e) = channel.send(&data).await {
                error!("Broadcast to {} failed: {:#}", remote_id, e);
            }
        }
    }

    pub fn state_of(&self, remote_id: &RemoteId) -> Option<NegotiationState> {
        self.states.get(remote_id).map(|s| *s)
    }

    pub fn contains_remote(&self, remote_id: &RemoteId) -> bool {
        self.states.contains_key(remote_id)
    }

    pub fn has_open_channel(&self, remote_id: &RemoteId) -> bool {
        self.channels.contains_key(remote_id)
    }

    /// Remotes with a live record, sorted by id.
    pub fn list_remotes(&self) -> Vec<RemoteId> {
        let mut ids: Vec<_> = self.states.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self) -> Vec<(RemoteId, NegotiationState)> {
        let mut all: Vec<_> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
