use crate::transport::{
    ConnectivityState, DataChannel, Transport, TransportConfig, TransportEventKind,
    TransportEvents, TransportFactory,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tether_core::{IceCandidate, SdpKind, SessionDescription};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Builds webrtc-rs peer connections.
#[derive(Clone, Default)]
pub struct WebRtcTransportFactory;

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        config: TransportConfig,
        events: TransportEvents,
    ) -> Result<Arc<dyn Transport>> {
        let transport = WebRtcTransport::new(config, events).await?;
        Ok(Arc::new(transport))
    }
}

pub struct WebRtcTransport {
    peer_connection: Arc<RTCPeerConnection>,
    events: TransportEvents,
}

impl WebRtcTransport {
    /// Create the peer connection and hook its callbacks up to `events`.
    pub async fn new(config: TransportConfig, events: TransportEvents) -> Result<Self> {
        let remote_id = events.remote_id().clone();

        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .with_context(|| format!("failed to create peer connection for {remote_id}"))?,
        );

        let state_events = events.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                let events = state_events.clone();

                Box::pin(async move {
                    info!("ICE state for {}: {:?}", events.remote_id(), s);
                    let Some(state) = connectivity_state(s) else {
                        return;
                    };
                    events
                        .emit(TransportEventKind::ConnectivityChanged(state))
                        .await;
                })
            },
        ));

        let ice_events = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let events = ice_events.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                events
                    .emit(TransportEventKind::CandidateGenerated(from_candidate_init(init)))
                    .await;
            })
        }));

        let dc_events = events.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let events = dc_events.clone();

            Box::pin(async move {
                debug!(
                    "Remote announced data channel '{}' for {}",
                    dc.label(),
                    events.remote_id()
                );
                wire_data_channel(dc, events);
            })
        }));

        Ok(Self {
            peer_connection,
            events,
        })
    }
}

#[async_trait]
impl Transport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await?;
        Ok(())
    }

    async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_candidate_init(candidate))
            .await
            .context("remote candidate rejected")?;
        Ok(())
    }

    async fn restart_connectivity(&self) -> Result<Option<SessionDescription>> {
        let options = RTCOfferOptions {
            ice_restart: true,
            ..Default::default()
        };
        let offer = self.peer_connection.create_offer(Some(options)).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(Some(SessionDescription::offer(offer.sdp)))
    }

    async fn open_data_channel(&self, label: &str) -> Result<()> {
        let dc = self
            .peer_connection
            .create_data_channel(label, None)
            .await
            .with_context(|| {
                format!("failed to create data channel for {}", self.events.remote_id())
            })?;
        wire_data_channel(dc, self.events.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

struct WebRtcDataChannel(Arc<RTCDataChannel>);

#[async_trait]
impl DataChannel for WebRtcDataChannel {
    fn label(&self) -> String {
        self.0.label().to_owned()
    }

    async fn send(&self, data: &Bytes) -> Result<usize> {
        Ok(self.0.send(data).await?)
    }

    async fn close(&self) -> Result<()> {
        self.0.close().await?;
        Ok(())
    }
}

// The channel is only handed to the hub once it can be written to.
fn wire_data_channel(dc: Arc<RTCDataChannel>, events: TransportEvents) {
    let dc_on_open = dc.clone();
    let open_events = events.clone();
    dc.on_open(Box::new(move || {
        let events = open_events.clone();
        let channel: Arc<dyn DataChannel> = Arc::new(WebRtcDataChannel(dc_on_open.clone()));

        Box::pin(async move {
            info!("Data channel open with {}", events.remote_id());
            events
                .emit(TransportEventKind::DataChannelOpen(channel))
                .await;
        })
    }));

    let msg_events = events.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let events = msg_events.clone();
        Box::pin(async move {
            let bytes = Bytes::from(msg.data.to_vec());
            events.emit(TransportEventKind::Message(bytes)).await;
        })
    }));

    dc.on_close(Box::new(move || {
        let events = events.clone();
        Box::pin(async move {
            info!("Data channel closed with {}", events.remote_id());
            events.emit(TransportEventKind::DataChannelClosed).await;
        })
    }));
}

fn connectivity_state(s: RTCIceConnectionState) -> Option<ConnectivityState> {
    Some(match s {
        RTCIceConnectionState::New => ConnectivityState::New,
        RTCIceConnectionState::Checking => ConnectivityState::Checking,
        RTCIceConnectionState::Connected => ConnectivityState::Connected,
        RTCIceConnectionState::Completed => ConnectivityState::Completed,
        RTCIceConnectionState::Disconnected => ConnectivityState::Disconnected,
        RTCIceConnectionState::Failed => ConnectivityState::Failed,
        RTCIceConnectionState::Closed => ConnectivityState::Closed,
        _ => return None,
    })
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
    };
    rtc.context("malformed session description")
}

fn to_candidate_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_candidate_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
