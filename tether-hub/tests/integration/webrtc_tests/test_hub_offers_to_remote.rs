use tether_core::RemoteId;
use tether_hub::{HubConfig, NegotiationRole, NegotiationState};

use crate::integration::{create_webrtc_hub, init_tracing};
use crate::utils::{TestClient, perform_offered_signaling, wait_for_client_ready};

#[tokio::test]
async fn test_hub_initiated_connection() {
    init_tracing();

    let config = HubConfig {
        role: NegotiationRole::Offerer,
        ..HubConfig::default()
    };
    let (hub, mut signal_rx, observer) = create_webrtc_hub(config);

    let remote_id = RemoteId::from("kiosk-1");
    let client = TestClient::new(remote_id.clone())
        .await
        .expect("Failed to create test client");

    perform_offered_signaling(&client, &hub, &mut signal_rx)
        .await
        .expect("Signaling failed");

    wait_for_client_ready(&client)
        .await
        .expect("Client not ready");

    assert!(
        observer
            .wait_for_state(&remote_id, NegotiationState::Connected, 5000)
            .await
    );
    assert!(observer.wait_for_events(5, 5000).await);
    assert!(
        observer
            .wait_for_event(5000, |e| matches!(e, tether_hub::HubEvent::DataChannelOpen { .. }))
            .await
            .is_some()
    );
    assert!(hub.context().has_open_channel(&remote_id));

    client.close().await.expect("Failed to close client");
}
