use tether_core::InboundSignal;

/// Input to the hub actor.
#[derive(Debug)]
pub enum HubCommand {
    /// An event from the signaling bus.
    Signal(InboundSignal),

    /// Announce this hub under `session_key` once its identity is known.
    CreateSession { session_key: String },

    /// Release every record and stop the event loop.
    Shutdown,
}

impl From<InboundSignal> for HubCommand {
    fn from(signal: InboundSignal) -> Self {
        HubCommand::Signal(signal)
    }
}
