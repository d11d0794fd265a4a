use tether_core::RemoteId;
use tether_hub::HubConfig;

use crate::integration::{create_test_hub, init_tracing};

#[tokio::test]
async fn test_signals_for_unknown_remote_create_nothing() {
    init_tracing();

    let hub = create_test_hub(HubConfig::default());
    let stranger = RemoteId::from("never-joined");

    hub.offer(&stranger).await;
    hub.answer(&stranger).await;
    hub.candidate(&stranger, "candidate:1").await;
    hub.leave(&stranger).await;

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert_eq!(hub.factory.created(), 0);
    assert!(hub.observer.events().await.is_empty());
    assert!(!hub.handle.context().contains_remote(&stranger));
    assert!(hub.signaling.sent().await.is_empty());
}
