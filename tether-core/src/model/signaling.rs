use crate::model::remote::RemoteId;
use crate::model::session::{IceCandidate, SessionDescription};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    #[serde(deserialize_with = "one_or_many")]
    pub urls: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

// Token endpoints hand out `urls` either as a single string or as a list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Urls {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Urls::deserialize(deserializer)? {
        Urls::One(url) => vec![url],
        Urls::Many(urls) => urls,
    })
}

/// Events delivered to the hub by the signaling bus.
///
/// On the wire every event is a frame `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum InboundSignal {
    SessionError {
        message: String,
    },
    CounterJoined {
        #[serde(rename = "counterId")]
        counter_id: RemoteId,
    },
    CounterLeft {
        #[serde(rename = "counterId")]
        counter_id: RemoteId,
    },
    Offer {
        from: RemoteId,
        offer: SessionDescription,
    },
    Answer {
        from: RemoteId,
        answer: SessionDescription,
    },
    IceCandidate {
        from: RemoteId,
        candidate: IceCandidate,
    },
}

impl InboundSignal {
    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }

    /// The remote this event concerns, if any.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            InboundSignal::SessionError { .. } => None,
            InboundSignal::CounterJoined { counter_id } | InboundSignal::CounterLeft { counter_id } => {
                Some(counter_id)
            }
            InboundSignal::Offer { from, .. }
            | InboundSignal::Answer { from, .. }
            | InboundSignal::IceCandidate { from, .. } => Some(from),
        }
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            InboundSignal::SessionError { .. } => "session-error",
            InboundSignal::CounterJoined { .. } => "counter-joined",
            InboundSignal::CounterLeft { .. } => "counter-left",
            InboundSignal::Offer { .. } => "offer",
            InboundSignal::Answer { .. } => "answer",
            InboundSignal::IceCandidate { .. } => "ice-candidate",
        }
    }
}

/// Events the hub emits onto the signaling bus, addressed `{to, from}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum OutboundSignal {
    CreateSession {
        #[serde(rename = "sessionKey")]
        session_key: String,
        #[serde(rename = "kioskId")]
        hub_id: RemoteId,
    },
    Offer {
        to: RemoteId,
        from: RemoteId,
        offer: SessionDescription,
    },
    Answer {
        to: RemoteId,
        from: RemoteId,
        answer: SessionDescription,
    },
    IceCandidate {
        to: RemoteId,
        from: RemoteId,
        candidate: IceCandidate,
    },
}

impl OutboundSignal {
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Addressee of the message; `None` for messages meant for the signaling server itself.
    pub fn recipient(&self) -> Option<&RemoteId> {
        match self {
            OutboundSignal::CreateSession { .. } => None,
            OutboundSignal::Offer { to, .. }
            | OutboundSignal::Answer { to, .. }
            | OutboundSignal::IceCandidate { to, .. } => Some(to),
        }
    }
}
