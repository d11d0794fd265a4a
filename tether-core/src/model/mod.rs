mod remote;
mod session;
mod signaling;

pub use remote::RemoteId;
pub use session::{IceCandidate, SdpKind, SessionDescription};
pub use signaling::{IceServerConfig, InboundSignal, OutboundSignal};
