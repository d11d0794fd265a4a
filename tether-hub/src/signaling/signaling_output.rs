use async_trait::async_trait;
use tether_core::OutboundSignal;

/// Outbound half of the signaling bus.
///
/// Delivery is best effort; implementations log failures instead of returning them.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send(&self, signal: OutboundSignal);
}
