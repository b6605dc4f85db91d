//! Room and token provisioning for outbound calls.
//!
//! Before a session can start, a dial-out enabled room has to exist and the
//! agent needs an owner token to join it. `RoomProvisioner` creates both and
//! derives the SIP URI for the number being called.

use crate::daily::DailyClient;
use crate::error::DialoutError;
use dialer_types::redact_text;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Prefix for provisioned room names.
const ROOM_NAME_PREFIX: &str = "dialer-sip";

/// Default room and token lifetime (2 hours).
pub const DEFAULT_ROOM_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// A room ready for an agent to join and dial out from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRoom {
    pub name: String,
    pub url: String,
    pub token: String,
    pub sip_uri: String,
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct MeetingTokenResponse {
    token: String,
}

#[derive(Debug, Clone)]
pub struct RoomProvisioner {
    client: DailyClient,
    sip_domain: String,
    room_ttl: Duration,
}

impl RoomProvisioner {
    pub fn new(client: DailyClient, sip_domain: impl Into<String>, room_ttl: Duration) -> Self {
        Self {
            client,
            sip_domain: sip_domain.into(),
            room_ttl,
        }
    }

    /// SIP URI for `phone_number` at the configured SIP domain.
    pub fn sip_uri_for(&self, phone_number: &str) -> Result<String, DialoutError> {
        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            return Err(DialoutError::Provision("phone number is empty".to_string()));
        }
        if phone_number
            .chars()
            .any(|c| c.is_whitespace() || c == '@' || c == ':')
        {
            return Err(DialoutError::Provision(format!(
                "invalid phone number: {}",
                redact_text(phone_number)
            )));
        }
        if self.sip_domain.is_empty() {
            return Err(DialoutError::Config("sip_domain is not configured".to_string()));
        }
        Ok(format!("sip:{}@{}", phone_number, self.sip_domain))
    }

    /// Unix timestamp at which a room provisioned now expires.
    fn expiry(&self) -> Result<i64, DialoutError> {
        i64::try_from(self.room_ttl.as_secs())
            .ok()
            .and_then(|ttl| chrono::Utc::now().timestamp().checked_add(ttl))
            .ok_or_else(|| {
                DialoutError::Config(format!("room TTL out of range: {:?}", self.room_ttl))
            })
    }

    /// Creates a dial-out enabled room and an owner token for it.
    pub async fn provision(&self, phone_number: &str) -> Result<ProvisionedRoom, DialoutError> {
        let sip_uri = self.sip_uri_for(phone_number)?;
        let name = format!("{}-{}", ROOM_NAME_PREFIX, Uuid::new_v4());
        let exp = self.expiry()?;

        let room: CreateRoomResponse = self
            .client
            .post_json(
                "rooms",
                &json!({
                    "name": name,
                    "properties": {
                        "exp": exp,
                        "enable_dialout": true,
                        "start_video_off": true,
                        "sip": {
                            "display_name": phone_number.trim(),
                            "video": false,
                            "sip_mode": "dial-in",
                            "num_endpoints": 1,
                        },
                    },
                }),
            )
            .await
            .map_err(|e| DialoutError::Provision(format!("failed to create room: {}", e)))?;

        let token: MeetingTokenResponse = self
            .client
            .post_json(
                "meeting-tokens",
                &json!({
                    "properties": {
                        "room_name": name,
                        "exp": exp,
                        "is_owner": true,
                    },
                }),
            )
            .await
            .map_err(|e| DialoutError::Provision(format!("failed to create meeting token: {}", e)))?;

        info!(room = %name, exp, "provisioned dial-out room");

        Ok(ProvisionedRoom {
            name,
            url: room.url,
            token: token.token,
            sip_uri,
        })
    }
}
