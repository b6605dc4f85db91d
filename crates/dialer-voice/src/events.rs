//! Lifecycle events and the channels that deliver them to a session.
//!
//! A session subscribes to two independent channels when it is created:
//! transport lifecycle events (`on_joined`, `on_dialout_answered`,
//! `on_dialout_error`, `on_client_disconnected`) and client events
//! (`on_client_ready`). Producers hold an [`EventSender`]; the coordinator
//! owns the matching [`SessionEvents`] receivers.

use crate::error::DialoutError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Default capacity for each per-session event channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle events reported by the call transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// The agent joined the media room.
    #[serde(rename = "on_joined")]
    Joined,
    /// The dialed party answered.
    #[serde(rename = "on_dialout_answered")]
    DialoutAnswered,
    /// The dial-out failed (busy, unreachable, rejected).
    #[serde(rename = "on_dialout_error")]
    DialoutError,
    /// The remote participant left the room.
    #[serde(rename = "on_client_disconnected")]
    ClientDisconnected,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "on_joined",
            Self::DialoutAnswered => "on_dialout_answered",
            Self::DialoutError => "on_dialout_error",
            Self::ClientDisconnected => "on_client_disconnected",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ParseEventKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_joined" => Ok(Self::Joined),
            "on_dialout_answered" => Ok(Self::DialoutAnswered),
            "on_dialout_error" => Ok(Self::DialoutError),
            "on_client_disconnected" => Ok(Self::ClientDisconnected),
            _ => Err(ParseEventKindError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone)]
pub struct ParseEventKindError(pub String);

impl std::fmt::Display for ParseEventKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown event: {}", self.0)
    }
}

impl std::error::Error for ParseEventKindError {}

/// A transport lifecycle event with its opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    pub kind: EventKind,
    pub payload: Value,
}

impl TransportEvent {
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// An event with a `null` payload.
    pub fn bare(kind: EventKind) -> Self {
        Self::new(kind, Value::Null)
    }
}

/// Events from the client/UI layer, delivered apart from transport events.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// `on_client_ready`: the client UI finished loading.
    Ready { payload: Value },
}

/// Name of the client readiness event on the wire.
pub const CLIENT_READY_EVENT: &str = "on_client_ready";

/// Either kind of event, as received from an external producer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Transport(TransportEvent),
    Client(ClientEvent),
}

impl SessionEvent {
    /// Resolves an event by its wire name.
    pub fn from_name(name: &str, payload: Value) -> Result<Self, ParseEventKindError> {
        if name == CLIENT_READY_EVENT {
            return Ok(Self::Client(ClientEvent::Ready { payload }));
        }
        let kind = name.parse()?;
        Ok(Self::Transport(TransportEvent::new(kind, payload)))
    }
}

/// Producer side of a session's event channels.
#[derive(Debug, Clone)]
pub struct EventSender {
    session_id: String,
    transport_tx: mpsc::Sender<TransportEvent>,
    client_tx: mpsc::Sender<ClientEvent>,
}

impl EventSender {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queues a transport lifecycle event.
    pub async fn send_transport(&self, event: TransportEvent) -> Result<(), DialoutError> {
        self.transport_tx
            .send(event)
            .await
            .map_err(|_| DialoutError::SessionClosed(self.session_id.clone()))
    }

    /// Queues a client event.
    pub async fn send_client(&self, event: ClientEvent) -> Result<(), DialoutError> {
        self.client_tx
            .send(event)
            .await
            .map_err(|_| DialoutError::SessionClosed(self.session_id.clone()))
    }

    pub async fn send(&self, event: SessionEvent) -> Result<(), DialoutError> {
        match event {
            SessionEvent::Transport(event) => self.send_transport(event).await,
            SessionEvent::Client(event) => self.send_client(event).await,
        }
    }

    /// True once the session has stopped reading transport events.
    pub fn is_closed(&self) -> bool {
        self.transport_tx.is_closed()
    }
}

/// Consumer side of a session's event channels.
#[derive(Debug)]
pub struct SessionEvents {
    pub(crate) transport_rx: mpsc::Receiver<TransportEvent>,
    pub(crate) client_rx: mpsc::Receiver<ClientEvent>,
}

/// Creates the paired transport and client channels for one session.
pub fn session_channels(
    session_id: impl Into<String>,
    capacity: usize,
) -> (EventSender, SessionEvents) {
    let (transport_tx, transport_rx) = mpsc::channel(capacity);
    let (client_tx, client_rx) = mpsc::channel(capacity);
    (
        EventSender {
            session_id: session_id.into(),
            transport_tx,
            client_tx,
        },
        SessionEvents {
            transport_rx,
            client_rx,
        },
    )
}
