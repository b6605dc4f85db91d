use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use dialer_server::{AppState, SessionRegistry};
use dialer_voice::{DailyClient, DailyConfig, RoomProvisioner, DEFAULT_ROOM_TTL};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct FakeApi {
    pub requests: Arc<Mutex<Vec<(String, Value)>>>,
    pub unavailable: bool,
}

impl FakeApi {
    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.paths().iter().filter(|p| p.ends_with(suffix)).count()
    }
}

async fn handle(State(api): State<FakeApi>, uri: Uri, Json(body): Json<Value>) -> Response {
    let path = uri.path().to_string();
    api.requests.lock().unwrap().push((path.clone(), body.clone()));

    if api.unavailable {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    match path.as_str() {
        "/v1/rooms" => Json(json!({
            "url": format!("https://example.daily.co/{}", body["name"].as_str().unwrap_or("")),
        }))
        .into_response(),
        "/v1/meeting-tokens" => Json(json!({"token": "owner-token"})).into_response(),
        _ => Json(json!({})).into_response(),
    }
}

/// Starts a fake REST API and returns app state wired to it.
pub async fn test_state(unavailable: bool, max_attempts: u32) -> (AppState, FakeApi) {
    let api = FakeApi {
        unavailable,
        ..FakeApi::default()
    };
    let router = Router::new().fallback(handle).with_state(api.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let daily = DailyClient::new(&DailyConfig::new(format!("http://{}/v1", addr), "key")).unwrap();
    let state = AppState {
        provisioner: RoomProvisioner::new(daily.clone(), "dev.sip.example.com", DEFAULT_ROOM_TTL),
        daily,
        max_attempts: NonZeroU32::new(max_attempts).unwrap(),
        sessions: SessionRegistry::new(),
    };
    (state, api)
}

pub fn agent_request(sip_uri: &str) -> Value {
    json!({
        "room_url": "https://example.daily.co/dialer-sip-test",
        "token": "meeting-token",
        "dialout_settings": {
            "sip_uri": sip_uri,
            "pathway": {
                "voicemail_message": "Sorry we missed you.",
                "global_prompt": "You are a care navigator.",
                "segments": [{"node": {"id": "start", "prompt": "Say hello."}, "edges": []}]
            }
        }
    })
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
