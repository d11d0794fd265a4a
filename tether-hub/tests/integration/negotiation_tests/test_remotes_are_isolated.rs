use tether_core::{RemoteId, SdpKind};
use tether_hub::{HubConfig, NegotiationState, RemovalReason};

use crate::integration::{create_test_hub, init_tracing};
use crate::utils::TransportCall;

#[tokio::test]
async fn test_failed_negotiation_does_not_touch_other_remotes() {
    init_tracing();

    let hub = create_test_hub(HubConfig::default());
    let broken = RemoteId::from("kiosk-broken");
    let healthy = RemoteId::from("kiosk-healthy");

    hub.factory.fail_remote_description(true);
    hub.join(&broken).await;
    hub.factory.wait_for_transport(0, 1000).await;
    hub.factory.fail_remote_description(false);
    hub.join(&healthy).await;
    hub.factory.wait_for_transport(1, 1000).await;

    hub.offer(&broken).await;
    hub.offer(&healthy).await;

    let reason = hub.observer.wait_for_removal(&broken, 2000).await;
    assert!(matches!(reason, Some(RemovalReason::Failed(_))));
    assert!(
        hub.observer
            .wait_for_state(&healthy, NegotiationState::DescriptionSet, 2000)
            .await
    );

    assert_eq!(
        hub.observer.states_of(&broken).await,
        vec![NegotiationState::OfferReceived, NegotiationState::Failed]
    );
    assert!(!hub.handle.context().contains_remote(&broken));
    assert_eq!(hub.handle.context().list_remotes(), vec![healthy.clone()]);
    assert_eq!(hub.signaling.answers_for(&broken).await.len(), 0);
    assert_eq!(hub.signaling.answers_for(&healthy).await.len(), 1);
}

#[tokio::test]
async fn test_stuck_remote_does_not_block_others() {
    init_tracing();

    let hub = create_test_hub(HubConfig::default());
    let slow = RemoteId::from("kiosk-slow");
    let fast = RemoteId::from("kiosk-fast");

    let gate = hub.factory.gate_remote_description();
    hub.join(&slow).await;
    let slow_transport = hub.factory.wait_for_transport(0, 1000).await;
    hub.factory.ungate_remote_description();
    hub.join(&fast).await;
    hub.factory.wait_for_transport(1, 1000).await;

    hub.offer(&slow).await;
    assert!(
        slow_transport
            .wait_for_call(TransportCall::SetRemote(SdpKind::Offer), 1000)
            .await
    );
    hub.offer(&fast).await;

    assert!(
        hub.observer
            .wait_for_state(&fast, NegotiationState::DescriptionSet, 2000)
            .await
    );
    assert_eq!(
        hub.handle.context().state_of(&slow),
        Some(NegotiationState::OfferReceived)
    );

    gate.notify_one();
    assert!(
        hub.observer
            .wait_for_state(&slow, NegotiationState::DescriptionSet, 2000)
            .await
    );
}
