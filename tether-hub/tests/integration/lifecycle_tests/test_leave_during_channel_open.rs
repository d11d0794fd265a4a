use std::time::Duration;
use tether_core::RemoteId;
use tether_hub::{HubConfig, NegotiationRole, RemovalReason};

use crate::integration::{create_test_hub, init_tracing};
use crate::utils::TransportCall;

#[tokio::test]
async fn test_leave_while_channel_opens_closes_transport() {
    init_tracing();

    let config = HubConfig {
        role: NegotiationRole::Offerer,
        ..HubConfig::default()
    };
    let hub = create_test_hub(config);
    hub.factory.delay_data_channel(Duration::from_millis(300));
    let remote_id = RemoteId::from("kiosk-1");

    hub.join(&remote_id).await;
    let transport = hub.factory.wait_for_transport(0, 1000).await;
    assert!(
        transport
            .wait_for_call(TransportCall::OpenDataChannel("data".into()), 1000)
            .await
    );

    hub.leave(&remote_id).await;
    assert_eq!(
        hub.observer.wait_for_removal(&remote_id, 1000).await,
        Some(RemovalReason::Left)
    );
    assert!(transport.wait_for_close(1000).await);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(hub.signaling.offers_for(&remote_id).await.is_empty());
    assert!(!transport.calls().contains(&TransportCall::CreateOffer));
    assert!(!hub.handle.context().has_open_channel(&remote_id));
}
