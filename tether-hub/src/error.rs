use std::time::Duration;
use tether_core::IceCandidate;
use thiserror::Error;

/// Why a step of one remote's negotiation did not complete.
///
/// Always local to that remote's record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("transport could not be created: {0}")]
    TransportUnavailable(String),

    #[error("{stage} failed: {reason}")]
    Description { stage: &'static str, reason: String },

    #[error("candidate rejected: {0}")]
    Candidate(String),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("local signaling identity unavailable")]
    IdentityUnavailable,
}

impl NegotiationError {
    pub(crate) fn description(stage: &'static str, err: anyhow::Error) -> Self {
        Self::Description {
            stage,
            reason: format!("{err:#}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub is not running")]
    Closed,

    #[error("malformed signaling frame: {0}")]
    Frame(#[from] serde_json::Error),
}

/// A drained candidate buffer refused a candidate; it is handed back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("candidate buffer already drained")]
pub struct BufferExhausted(pub IceCandidate);

#[derive(Debug, Error)]
pub enum IceServerError {
    #[error("ice server request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid ice servers: {0}")]
    Invalid(String),
}
