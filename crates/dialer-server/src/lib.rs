//! Dialer server library logic.
//!
//! Exposes an HTTP API that starts dial-out sessions, provisions rooms for
//! outbound calls, and feeds lifecycle events from the media platform into
//! running sessions.

pub mod api;
pub mod config;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use dialer_types::redact_text;
use dialer_voice::{DailyClient, RoomProvisioner, RunningSession, SessionControl};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// REST client used to build per-room transports.
    pub daily: DailyClient,
    /// Creates rooms and tokens for `/calls`.
    pub provisioner: RoomProvisioner,
    /// Dial attempt budget applied to every new session.
    pub max_attempts: NonZeroU32,
    /// Sessions that are still running.
    pub sessions: SessionRegistry,
}

/// Running sessions by ID.
///
/// Uses `std::sync::RwLock` intentionally: every acquisition is a brief
/// HashMap operation that never spans an `.await`. A poisoned lock is
/// recovered, since no operation leaves the map half-updated.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionControl>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionControl>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionControl>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tracks `running` until its task finishes, then drops it.
    pub fn register(&self, running: RunningSession) -> String {
        let RunningSession { control, task } = running;
        let session_id = control.handle.id().to_string();
        self.write().insert(session_id.clone(), control);

        let registry = self.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(state)) => tracing::debug!(session_id = %id, %state, "session finished"),
                Ok(Err(e)) => tracing::warn!(
                    session_id = %id,
                    "session ended with error: {}",
                    redact_text(&e.to_string())
                ),
                Err(e) => tracing::error!(session_id = %id, "session task join error: {}", e),
            }
            registry.remove(&id);
        });

        session_id
    }

    pub fn get(&self, session_id: &str) -> Option<SessionControl> {
        self.read().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionControl> {
        self.write().remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/start", post(api::start_handler))
        .route("/calls", post(api::create_call_handler))
        .route("/sessions/{session_id}", get(api::get_session_handler))
        .route("/sessions/{session_id}/events", post(api::post_event_handler))
        .layer(Extension(Arc::new(state)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialer_types::{DialoutTarget, Pathway};
    use dialer_voice::{spawn_session, CallState, DailyConfig, DailyTransport, SessionTask};

    fn idle_session(id: &str) -> RunningSession {
        let client = DailyClient::new(&DailyConfig::new("http://127.0.0.1:1", "key")).unwrap();
        let transport = Arc::new(
            DailyTransport::new(client, "https://example.daily.co/dialer-sip-test").unwrap(),
        );
        let target = DialoutTarget::new(
            "sip:+15551234567@dev.sip.example.com",
            Pathway {
                voicemail_message: String::new(),
                global_prompt: String::new(),
                segments: vec![],
            },
        );
        spawn_session(id, target, transport.clone(), transport, NonZeroU32::MIN)
    }

    #[tokio::test]
    async fn register_recovers_a_poisoned_lock() {
        let registry = SessionRegistry::new();
        let sessions = Arc::clone(&registry.sessions);
        let _ = std::thread::spawn(move || {
            let _guard = sessions.write().unwrap();
            panic!("writer panicked while holding the registry lock");
        })
        .join();
        assert!(registry.sessions.is_poisoned());

        let session_id = registry.register(idle_session("after-poison"));
        let control = registry.get(&session_id).expect("session should be reachable");
        assert_eq!(control.current_state(), CallState::AwaitingJoin);
        assert_eq!(registry.len(), 1);

        control.handle.cancel().await;
        assert_eq!(control.current_state(), CallState::Terminated);
    }
}
