use crate::error::IceServerError;
use crate::transport::TransportConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tether_core::IceServerConfig;
use tracing::{debug, error};

/// Where a new transport gets its STUN/TURN servers from.
#[async_trait]
pub trait IceServerProvider: Send + Sync {
    async fn ice_servers(&self) -> Result<Vec<IceServerConfig>, IceServerError>;
}

#[derive(Debug, Clone)]
pub struct StaticIceServers(pub Vec<IceServerConfig>);

impl Default for StaticIceServers {
    fn default() -> Self {
        Self(TransportConfig::default().ice_servers)
    }
}

#[async_trait]
impl IceServerProvider for StaticIceServers {
    async fn ice_servers(&self) -> Result<Vec<IceServerConfig>, IceServerError> {
        Ok(self.0.clone())
    }
}

/// Fetches short-lived TURN credentials from a token endpoint that answers
/// `POST {}` with `{"iceServers": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpIceServers {
    client: Client,
    url: String,
}

impl HttpIceServers {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl IceServerProvider for HttpIceServers {
    async fn ice_servers(&self) -> Result<Vec<IceServerConfig>, IceServerError> {
        let response: Value = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Token endpoint response: {}", response);
        parse_ice_servers(response).inspect_err(|e| error!("Failed to fetch ICE servers: {}", e))
    }
}

fn parse_ice_servers(response: Value) -> Result<Vec<IceServerConfig>, IceServerError> {
    let Some(servers) = response.get("iceServers") else {
        return Err(IceServerError::Invalid("missing iceServers".into()));
    };
    if !servers.is_array() {
        return Err(IceServerError::Invalid("iceServers is not an array".into()));
    }
    serde_json::from_value(servers.clone()).map_err(|e| IceServerError::Invalid(e.to_string()))
}
