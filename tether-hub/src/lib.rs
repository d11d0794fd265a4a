//! Per-remote connection negotiation for a hub that serves many WebRTC peers.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hub;
pub mod negotiation;
pub mod signaling;
pub mod transport;

pub use config::{HubConfig, NegotiationRole};
pub use error::{HubError, NegotiationError};
pub use hub::{Hub, HubContext, HubEvent, HubHandle, HubObserver, Observers};
pub use negotiation::{NegotiationState, RemovalReason};
