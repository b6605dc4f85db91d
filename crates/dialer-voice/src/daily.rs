//! Daily REST API client and the call transport built on it.

use crate::config::DailyConfig;
use crate::error::{DialoutError, TransportError};
use crate::transport::{CallTransport, ClientReadiness};
use async_trait::async_trait;
use dialer_types::DialoutTarget;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

/// RTVI protocol version announced in the bot-ready message.
const RTVI_PROTOCOL_VERSION: &str = "1.0.0";

/// Authenticated JSON client for the Daily REST API.
#[derive(Clone)]
pub struct DailyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for DailyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl DailyClient {
    pub fn new(config: &DailyConfig) -> Result<Self, DialoutError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DialoutError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// POSTs `body` to `path` and decodes the JSON response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, TransportError> {
        let response = self.send(path, body).await?;
        Ok(response.json::<T>().await?)
    }

    /// POSTs `body` to `path`, discarding the response body.
    pub async fn post(&self, path: &str, body: &Value) -> Result<(), TransportError> {
        self.send(path, body).await.map(drop)
    }

    async fn send(&self, path: &str, body: &Value) -> Result<reqwest::Response, TransportError> {
        let endpoint = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%endpoint, "daily API request");

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Extracts the room name from a room URL such as
/// `https://example.daily.co/my-room`.
pub fn room_name_from_url(room_url: &str) -> Result<String, TransportError> {
    let parsed =
        url::Url::parse(room_url).map_err(|e| TransportError::InvalidRoom(e.to_string()))?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| TransportError::InvalidRoom(format!("no room name in {}", room_url)))
}

/// Call transport for one Daily room.
#[derive(Debug, Clone)]
pub struct DailyTransport {
    client: DailyClient,
    room_name: String,
}

impl DailyTransport {
    pub fn new(client: DailyClient, room_url: &str) -> Result<Self, DialoutError> {
        let room_name = room_name_from_url(room_url)?;
        Ok(Self { client, room_name })
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }
}

#[async_trait]
impl CallTransport for DailyTransport {
    async fn start_dialout(&self, target: &DialoutTarget) -> Result<(), TransportError> {
        self.client
            .post(
                &format!("rooms/{}/dialOut/start", self.room_name),
                &json!({ "sipUri": target.sip_uri() }),
            )
            .await
    }
}

#[async_trait]
impl ClientReadiness for DailyTransport {
    async fn set_ready(&self) -> Result<(), TransportError> {
        self.client
            .post(
                &format!("rooms/{}/send-app-message", self.room_name),
                &json!({
                    "recipient": "*",
                    "data": {
                        "label": "rtvi-ai",
                        "type": "bot-ready",
                        "data": { "version": RTVI_PROTOCOL_VERSION },
                    },
                }),
            )
            .await
    }
}
