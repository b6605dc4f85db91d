//! Agent start requests and dial-out settings.
//!
//! `AgentRequest` is the body sent to start a dial-out session. It is parsed
//! and validated here so that a malformed request fails before any session
//! state is created.

use crate::pathway::Pathway;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// URL schemes accepted for a media room.
const ROOM_URL_SCHEMES: [&str; 4] = ["http", "https", "ws", "wss"];

/// Errors raised while parsing or validating a start request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request body is not valid JSON for the expected shape.
    #[error("malformed request: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field is present but unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl RequestError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Settings for the outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialoutSettings {
    /// The SIP URI to dial.
    pub sip_uri: String,
    pub pathway: Pathway,
}

/// Request data sent to start a dial-out session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Media room the agent joins before dialing.
    pub room_url: String,
    /// Meeting token used to join the room.
    pub token: String,
    pub dialout_settings: DialoutSettings,
}

impl AgentRequest {
    /// Parses and validates a request from a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::Parse` for malformed JSON and
    /// `RequestError::Invalid` when a field fails validation.
    pub fn from_json(body: &[u8]) -> Result<Self, RequestError> {
        let request: Self = serde_json::from_slice(body)?;
        request.validate()?;
        Ok(request)
    }

    /// Checks the fields the session core relies on.
    ///
    /// The pathway is not inspected.
    pub fn validate(&self) -> Result<(), RequestError> {
        validate_room_url(&self.room_url)?;
        if self.token.trim().is_empty() {
            return Err(RequestError::invalid("token", "token is empty"));
        }
        validate_sip_uri(&self.dialout_settings.sip_uri)
    }

    /// Builds the dial-out target for this request.
    pub fn target(&self) -> DialoutTarget {
        DialoutTarget::from(self.dialout_settings.clone())
    }
}

/// Validates a media room URL.
pub fn validate_room_url(room_url: &str) -> Result<(), RequestError> {
    if room_url.trim().is_empty() {
        return Err(RequestError::invalid("room_url", "room URL is empty"));
    }
    let parsed = url::Url::parse(room_url)
        .map_err(|e| RequestError::invalid("room_url", e.to_string()))?;
    if !ROOM_URL_SCHEMES.contains(&parsed.scheme()) {
        return Err(RequestError::invalid(
            "room_url",
            format!("unsupported scheme: {}", parsed.scheme()),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(RequestError::invalid("room_url", "room URL has no host"));
    }
    Ok(())
}

/// Validates a SIP URI of the form `sip:[user@]host[...]` or `sips:...`.
pub fn validate_sip_uri(sip_uri: &str) -> Result<(), RequestError> {
    let rest = sip_uri
        .strip_prefix("sip:")
        .or_else(|| sip_uri.strip_prefix("sips:"))
        .ok_or_else(|| RequestError::invalid("sip_uri", "must start with sip: or sips:"))?;

    if rest.chars().any(char::is_whitespace) {
        return Err(RequestError::invalid("sip_uri", "contains whitespace"));
    }

    let host = match rest.rsplit_once('@') {
        Some((user, host)) => {
            if user.is_empty() {
                return Err(RequestError::invalid("sip_uri", "user part is empty"));
            }
            host
        }
        None => rest,
    };
    if host.is_empty() {
        return Err(RequestError::invalid("sip_uri", "host part is empty"));
    }
    Ok(())
}

/// The destination of a dial-out: a SIP address plus the pathway payload
/// forwarded to downstream consumers.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialoutTarget {
    sip_uri: String,
    pathway: Pathway,
}

impl DialoutTarget {
    pub fn new(sip_uri: impl Into<String>, pathway: Pathway) -> Self {
        Self {
            sip_uri: sip_uri.into(),
            pathway,
        }
    }

    pub fn sip_uri(&self) -> &str {
        &self.sip_uri
    }

    pub fn pathway(&self) -> &Pathway {
        &self.pathway
    }
}

impl From<DialoutSettings> for DialoutTarget {
    fn from(settings: DialoutSettings) -> Self {
        Self::new(settings.sip_uri, settings.pathway)
    }
}
