//! API handlers for the dialer server.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dialer_types::{redact_sip_uri, AgentRequest, DialoutSettings, Pathway};
use dialer_voice::{spawn_session, CallState, DailyTransport, DialoutError, SessionEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Response body for a started session.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Request body for `POST /calls`.
#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    /// Number to dial, e.g. `+15551234567`.
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    pub pathway: Pathway,
}

/// Response body for `POST /calls`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCallResponse {
    pub status: String,
    /// Name of the provisioned room.
    #[serde(rename = "callId")]
    pub call_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Request body for `POST /sessions/{id}/events`.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Event name, e.g. `on_dialout_error` or `on_client_ready`.
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Response body for `GET /sessions/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub state: CallState,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream failure: {0}")]
    BadGateway(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Validates `request` and starts a session for it.
fn start_session(state: &AppState, request: &AgentRequest) -> Result<String, ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let transport = Arc::new(
        DailyTransport::new(state.daily.clone(), &request.room_url)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    );

    tracing::info!(
        room = %transport.room_name(),
        sip_uri = %redact_sip_uri(&request.dialout_settings.sip_uri),
        token_len = request.token.len(),
        "starting dial-out session"
    );

    let running = spawn_session(
        Uuid::new_v4().to_string(),
        request.target(),
        transport.clone(),
        transport,
        state.max_attempts,
    );
    Ok(state.sessions.register(running))
}

/// Handler for `POST /start`.
pub async fn start_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    let request = AgentRequest::from_json(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let session_id = start_session(&state, &request)?;
    Ok((StatusCode::CREATED, Json(StartResponse { session_id })))
}

/// Handler for `POST /calls`.
///
/// Provisions a room and owner token for the number, then starts a session
/// that dials it.
pub async fn create_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateCallRequest>,
) -> Result<(StatusCode, Json<CreateCallResponse>), ApiError> {
    state
        .provisioner
        .sip_uri_for(&payload.phone_number)
        .map_err(|e| match e {
            DialoutError::Config(msg) => ApiError::InternalServerError(msg),
            other => ApiError::BadRequest(other.to_string()),
        })?;

    let room = state
        .provisioner
        .provision(&payload.phone_number)
        .await
        .map_err(|e| match e {
            DialoutError::Config(msg) => ApiError::InternalServerError(msg),
            other => ApiError::BadGateway(other.to_string()),
        })?;

    let request = AgentRequest {
        room_url: room.url,
        token: room.token,
        dialout_settings: DialoutSettings {
            sip_uri: room.sip_uri,
            pathway: payload.pathway,
        },
    };
    let session_id = start_session(&state, &request)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCallResponse {
            status: "initiated".to_string(),
            call_id: room.name,
            session_id,
        }),
    ))
}

/// Handler for `POST /sessions/{session_id}/events`.
pub async fn post_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<EventRequest>,
) -> Result<StatusCode, ApiError> {
    let event = SessionEvent::from_name(&payload.event, payload.payload)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let entry = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;

    entry.events.send(event).await.map_err(|e| match e {
        DialoutError::SessionClosed(id) => ApiError::NotFound(format!("session not active: {}", id)),
        other => ApiError::InternalServerError(other.to_string()),
    })?;

    Ok(StatusCode::ACCEPTED)
}

/// Handler for `GET /sessions/{session_id}`.
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let entry = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("session not found: {}", session_id)))?;

    Ok(Json(SessionStatusResponse {
        state: entry.current_state(),
        session_id,
    }))
}
