use std::sync::Arc;
use tether_core::{RemoteId, SdpKind};
use tether_hub::transport::{ConnectivityState, TransportEventKind};
use tether_hub::{HubConfig, HubEvent, NegotiationState, RemovalReason};

use crate::integration::{TestHub, create_test_hub, init_tracing};
use crate::utils::{MockTransport, TransportCall};

async fn connected(hub: &TestHub, remote_id: &RemoteId) -> Arc<MockTransport> {
    hub.join(remote_id).await;
    hub.offer(remote_id).await;
    assert!(
        hub.observer
            .wait_for_state(remote_id, NegotiationState::DescriptionSet, 2000)
            .await
    );
    let transport = hub.factory.wait_for_transport(0, 1000).await;
    transport
        .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Connected))
        .await;
    assert!(
        hub.observer
            .wait_for_state(remote_id, NegotiationState::Connected, 1000)
            .await
    );
    transport
}

fn restarts(transport: &MockTransport) -> usize {
    transport
        .calls()
        .into_iter()
        .filter(|c| *c == TransportCall::Restart)
        .count()
}

#[tokio::test]
async fn test_failure_restarts_once_then_closes() {
    init_tracing();

    let hub = create_test_hub(HubConfig::default());
    let remote_id = RemoteId::from("kiosk-1");
    let transport = connected(&hub, &remote_id).await;

    transport
        .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Failed))
        .await;
    assert!(transport.wait_for_call(TransportCall::Restart, 1000).await);
    assert_eq!(
        hub.handle.context().state_of(&remote_id),
        Some(NegotiationState::Degraded)
    );

    transport
        .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Failed))
        .await;
    assert_eq!(
        hub.observer.wait_for_removal(&remote_id, 1000).await,
        Some(RemovalReason::ConnectivityLost)
    );
    assert!(transport.wait_for_close(1000).await);
    assert_eq!(restarts(&transport), 1);
    assert_eq!(
        hub.observer.states_of(&remote_id).await,
        vec![
            NegotiationState::OfferReceived,
            NegotiationState::DescriptionSet,
            NegotiationState::Connected,
            NegotiationState::Degraded,
            NegotiationState::Closed,
        ]
    );
}

#[tokio::test]
async fn test_recovery_restores_the_restart_budget() {
    init_tracing();

    let hub = create_test_hub(HubConfig::default());
    let remote_id = RemoteId::from("kiosk-1");
    let transport = connected(&hub, &remote_id).await;

    for _ in 0..2 {
        transport
            .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Failed))
            .await;
        transport
            .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Completed))
            .await;
    }

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(restarts(&transport), 2);
    assert_eq!(
        hub.handle.context().state_of(&remote_id),
        Some(NegotiationState::Connected)
    );
}

#[tokio::test]
async fn test_restart_offer_accepts_one_answer() {
    init_tracing();

    let hub = create_test_hub(HubConfig::default());
    hub.factory.restart_offers(true);
    let remote_id = RemoteId::from("kiosk-1");
    let transport = connected(&hub, &remote_id).await;

    transport
        .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Failed))
        .await;
    let offer = hub
        .signaling
        .wait_for(1000, |s| matches!(s, tether_core::OutboundSignal::Offer { .. }))
        .await;
    assert!(offer.is_some(), "restart should send a fresh offer");

    // The hub applies the answer only once its restart step has finished.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    hub.answer(&remote_id).await;
    hub.answer(&remote_id).await;

    assert!(
        transport
            .wait_for_call(TransportCall::SetRemote(SdpKind::Answer), 1000)
            .await
    );
    assert!(
        hub.observer
            .wait_for_event(1000, |e| matches!(e, HubEvent::SignalRejected { event: "answer", .. }))
            .await
            .is_some()
    );

    transport
        .emit(TransportEventKind::ConnectivityChanged(ConnectivityState::Connected))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(
        hub.handle.context().state_of(&remote_id),
        Some(NegotiationState::Connected)
    );
}
