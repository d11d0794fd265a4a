use anyhow::{Context, Result};
use tether_core::{InboundSignal, OutboundSignal, RemoteId, SessionDescription};
use tether_hub::HubHandle;
use tokio::sync::mpsc;

use super::test_client::TestClient;

/// Timeout for signal exchange operations (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 5000;

/// Timeout for ICE gathering (ms).
pub const ICE_GATHERING_TIMEOUT_MS: u64 = 3000;

/// Timeout for connection establishment (ms).
pub const CONNECTION_TIMEOUT_MS: u64 = 10000;

/// Timeout for data channel opening (ms).
pub const DATA_CHANNEL_TIMEOUT_MS: u64 = 5000;

/// Join, offer from the client, apply the hub's answer and trade candidates.
pub async fn perform_signaling(
    client: &TestClient,
    hub: &HubHandle,
    signal_rx: &mut mpsc::UnboundedReceiver<OutboundSignal>,
) -> Result<()> {
    let remote_id = client.remote_id.clone();

    hub.signal(InboundSignal::CounterJoined {
        counter_id: remote_id.clone(),
    })
    .await?;

    let offer = client
        .create_offer()
        .await
        .context("Failed to create offer")?;
    hub.signal(InboundSignal::Offer {
        from: remote_id.clone(),
        offer,
    })
    .await?;
    tracing::debug!("[SignalHelper] Sent offer for {}", remote_id);

    let answer = wait_for_description(signal_rx, &remote_id, SIGNAL_TIMEOUT_MS)
        .await
        .context("Failed to receive answer")?;
    client
        .set_remote_answer(answer)
        .await
        .context("Failed to set remote answer")?;
    tracing::debug!("[SignalHelper] Applied answer for {}", remote_id);

    exchange_ice_candidates(client, hub, signal_rx).await
}

/// Join and let the hub offer; the client answers.
pub async fn perform_offered_signaling(
    client: &TestClient,
    hub: &HubHandle,
    signal_rx: &mut mpsc::UnboundedReceiver<OutboundSignal>,
) -> Result<()> {
    let remote_id = client.remote_id.clone();

    hub.signal(InboundSignal::CounterJoined {
        counter_id: remote_id.clone(),
    })
    .await?;

    let offer = wait_for_description(signal_rx, &remote_id, SIGNAL_TIMEOUT_MS)
        .await
        .context("Failed to receive offer")?;
    let answer = client
        .accept_offer(offer)
        .await
        .context("Failed to answer offer")?;
    hub.signal(InboundSignal::Answer {
        from: remote_id.clone(),
        answer,
    })
    .await?;
    tracing::debug!("[SignalHelper] Sent answer for {}", remote_id);

    exchange_ice_candidates(client, hub, signal_rx).await
}

/// Wait for the hub to send an offer or answer to `remote_id`.
/// The hub forwards its candidates only after the description, so nothing is skipped here.
async fn wait_for_description(
    signal_rx: &mut mpsc::UnboundedReceiver<OutboundSignal>,
    remote_id: &RemoteId,
    timeout_ms: u64,
) -> Result<SessionDescription> {
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    loop {
        let recv_timeout =
            tokio::time::timeout(std::time::Duration::from_millis(100), signal_rx.recv());

        match recv_timeout.await {
            Ok(Some(OutboundSignal::Answer { to, answer, .. })) if &to == remote_id => {
                return Ok(answer);
            }
            Ok(Some(OutboundSignal::Offer { to, offer, .. })) if &to == remote_id => {
                return Ok(offer);
            }
            Ok(Some(_)) => continue,
            Ok(None) => anyhow::bail!("Signal channel closed"),
            Err(_) => {
                if start.elapsed() > timeout {
                    anyhow::bail!("Timeout waiting for description");
                }
            }
        }
    }
}

/// Exchange ICE candidates between client and hub for a limited time.
async fn exchange_ice_candidates(
    client: &TestClient,
    hub: &HubHandle,
    signal_rx: &mut mpsc::UnboundedReceiver<OutboundSignal>,
) -> Result<()> {
    let remote_id = client.remote_id.clone();
    let exchange_duration = std::time::Duration::from_millis(ICE_GATHERING_TIMEOUT_MS);

    for candidate in client.gather_ice_candidates(ICE_GATHERING_TIMEOUT_MS).await {
        hub.signal(InboundSignal::IceCandidate {
            from: remote_id.clone(),
            candidate,
        })
        .await?;
    }

    let start = std::time::Instant::now();
    while start.elapsed() < exchange_duration {
        let recv_timeout =
            tokio::time::timeout(std::time::Duration::from_millis(100), signal_rx.recv());

        match recv_timeout.await {
            Ok(Some(OutboundSignal::IceCandidate { to, candidate, .. })) if to == remote_id => {
                if let Err(e) = client.add_ice_candidate(candidate).await {
                    tracing::warn!("[SignalHelper] Failed to add ICE candidate: {}", e);
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(_) => continue,
        }
    }

    Ok(())
}

/// Wait for the client to be fully connected (connection + data channel).
pub async fn wait_for_client_ready(client: &TestClient) -> Result<()> {
    client
        .wait_for_connection(CONNECTION_TIMEOUT_MS)
        .await
        .context("Connection not established")?;

    client
        .wait_for_data_channel(DATA_CHANNEL_TIMEOUT_MS)
        .await
        .context("Data channel not opened")?;

    Ok(())
}
