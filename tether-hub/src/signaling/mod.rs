mod frame_signaling;
mod ice_servers;
mod identity;
mod signaling_output;

pub use frame_signaling::*;
pub use ice_servers::*;
pub use identity::*;
pub use signaling_output::*;
