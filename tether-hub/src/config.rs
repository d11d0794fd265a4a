use serde::Deserialize;
use std::time::Duration;

/// Which side of the offer/answer exchange the hub plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationRole {
    /// Remotes offer, the hub answers.
    #[default]
    Answerer,
    /// The hub opens a data channel and offers as soon as a remote joins.
    Offerer,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub role: NegotiationRole,
    /// Upper bound on candidates held for a remote that has no remote description yet.
    /// The oldest candidate is dropped on overflow.
    pub candidate_buffer_limit: usize,
    /// Bound on a single description step (create, apply, restart).
    pub negotiation_timeout_ms: u64,
    /// How long an outbound message may wait for the hub's own identity.
    pub identity_timeout_ms: u64,
    /// Automatic connectivity restarts before a failing record is closed.
    pub max_connectivity_restarts: u32,
    /// Label of the data channel the hub opens in the offerer role.
    pub data_channel_label: String,
    pub command_capacity: usize,
    pub transport_event_capacity: usize,
    /// Lines kept by the diagnostics trail.
    pub diagnostics_capacity: usize,
}

impl HubConfig {
    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_millis(self.negotiation_timeout_ms)
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_timeout_ms)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            role: NegotiationRole::Answerer,
            candidate_buffer_limit: 256,
            negotiation_timeout_ms: 10_000,
            identity_timeout_ms: 10_000,
            max_connectivity_restarts: 1,
            data_channel_label: "data".to_owned(),
            command_capacity: 100,
            transport_event_capacity: 256,
            diagnostics_capacity: 500,
        }
    }
}
