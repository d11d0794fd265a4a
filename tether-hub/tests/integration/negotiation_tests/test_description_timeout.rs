use std::time::Duration;
use tether_core::{RemoteId, SdpKind};
use tether_hub::{HubConfig, NegotiationError, NegotiationState, RemovalReason};

use crate::integration::{create_test_hub, init_tracing};
use crate::utils::TransportCall;

#[tokio::test]
async fn test_stalled_remote_description_fails_the_record() {
    init_tracing();

    let config = HubConfig {
        negotiation_timeout_ms: 100,
        ..HubConfig::default()
    };
    let hub = create_test_hub(config);
    let _gate = hub.factory.gate_remote_description();
    let remote_id = RemoteId::from("kiosk-1");

    hub.join(&remote_id).await;
    hub.offer(&remote_id).await;

    let transport = hub.factory.wait_for_transport(0, 1000).await;
    assert!(
        transport
            .wait_for_call(TransportCall::SetRemote(SdpKind::Offer), 1000)
            .await
    );

    let reason = hub.observer.wait_for_removal(&remote_id, 2000).await;
    assert!(
        matches!(
            &reason,
            Some(RemovalReason::Failed(NegotiationError::Timeout { stage, after }))
                if *stage == "apply remote description" && *after == Duration::from_millis(100)
        ),
        "unexpected removal: {reason:?}"
    );

    assert!(transport.wait_for_close(1000).await);
    assert!(hub.signaling.answers_for(&remote_id).await.is_empty());
    assert!(!hub.handle.context().contains_remote(&remote_id));
    assert_eq!(
        hub.observer.states_of(&remote_id).await,
        vec![NegotiationState::OfferReceived, NegotiationState::Failed]
    );
}
