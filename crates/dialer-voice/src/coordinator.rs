//! Event-driven lifecycle of a dial-out session.
//!
//! The coordinator reacts to transport and client events, drives the
//! [`DialoutController`], and cancels the session when the call can no
//! longer proceed. Its states:
//!
//! | State | Meaning |
//! |-------|---------|
//! | `AwaitingJoin` | waiting for the agent to join the room |
//! | `Dialing` | first dial request issued |
//! | `Retrying` | a dial failed and another attempt was issued |
//! | `Connected` | the dialed party answered |
//! | `Terminated` | cancellation requested; absorbing |
//!
//! Events are handled strictly one at a time, so the controller is only ever
//! touched through `&mut self`. Readiness acknowledgements run on their own
//! tasks and never hold up lifecycle events.

use crate::controller::DialoutController;
use crate::error::DialoutError;
use crate::events::{ClientEvent, EventKind, SessionEvents, TransportEvent};
use crate::session::SessionTask;
use crate::transport::ClientReadiness;
use dialer_types::redact_payload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    AwaitingJoin,
    Dialing,
    Retrying,
    Connected,
    Terminated,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingJoin => "AWAITING_JOIN",
            Self::Dialing => "DIALING",
            Self::Retrying => "RETRYING",
            Self::Connected => "CONNECTED",
            Self::Terminated => "TERMINATED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated)
    }

    fn is_dialing(self) -> bool {
        matches!(self, Self::Dialing | Self::Retrying)
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SessionLifecycleCoordinator {
    controller: DialoutController,
    session: Arc<dyn SessionTask>,
    readiness: Arc<dyn ClientReadiness>,
    state: CallState,
    state_tx: watch::Sender<CallState>,
    ready_acks: JoinSet<()>,
}

impl std::fmt::Debug for SessionLifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLifecycleCoordinator")
            .field("controller", &self.controller)
            .field("state", &self.state)
            .field("pending_ready_acks", &self.ready_acks.len())
            .finish_non_exhaustive()
    }
}

impl SessionLifecycleCoordinator {
    pub fn new(
        controller: DialoutController,
        session: Arc<dyn SessionTask>,
        readiness: Arc<dyn ClientReadiness>,
    ) -> Self {
        let (state_tx, _) = watch::channel(CallState::AwaitingJoin);
        Self {
            controller,
            session,
            readiness,
            state: CallState::AwaitingJoin,
            state_tx,
            ready_acks: JoinSet::new(),
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn controller(&self) -> &DialoutController {
        &self.controller
    }

    /// Watches state transitions from outside the session task.
    pub fn subscribe_state(&self) -> watch::Receiver<CallState> {
        self.state_tx.subscribe()
    }

    /// Applies one transport lifecycle event.
    ///
    /// A failure to issue a dial request is returned to the caller untouched;
    /// it is not treated as a dial error and is never retried here.
    pub async fn handle_transport_event(
        &mut self,
        event: TransportEvent,
    ) -> Result<CallState, DialoutError> {
        if self.state.is_terminal() {
            debug!(event = %event.kind, "session terminated, ignoring event");
            return Ok(self.state);
        }

        let next = match event.kind {
            EventKind::Joined if self.state == CallState::AwaitingJoin => {
                info!("joined room, starting dial-out");
                self.controller.attempt_dialout().await?;
                CallState::Dialing
            }
            EventKind::DialoutAnswered if self.state.is_dialing() => {
                debug!(payload = %redact_payload(&event.payload), "dial-out answered");
                self.controller.mark_successful();
                CallState::Connected
            }
            EventKind::DialoutError if self.state.is_dialing() => {
                warn!(payload = %redact_payload(&event.payload), "dial-out error");
                if self.controller.should_retry() {
                    self.controller.attempt_dialout().await?;
                    CallState::Retrying
                } else {
                    error!(
                        attempts = self.controller.attempt_count(),
                        "no more dial-out retries allowed, stopping session"
                    );
                    self.terminate().await
                }
            }
            EventKind::DialoutError if self.state == CallState::Connected => {
                debug!(
                    payload = %redact_payload(&event.payload),
                    "dial-out error after call was answered, ignoring"
                );
                self.state
            }
            EventKind::ClientDisconnected => {
                info!("client disconnected, stopping session");
                self.terminate().await
            }
            kind => {
                warn!(event = %kind, state = %self.state, "unexpected event for state, ignoring");
                self.state
            }
        };

        self.set_state(next);
        Ok(next)
    }

    /// Applies one client event. Readiness has no effect on the dial-out.
    ///
    /// The acknowledgement is sent on a separate task; a slow or failing
    /// `set_ready` is only logged.
    pub fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Ready { .. } => {
                info!("client ready");
                let readiness = Arc::clone(&self.readiness);
                self.ready_acks.spawn(async move {
                    if let Err(e) = readiness.set_ready().await {
                        warn!("failed to signal agent readiness: {}", e);
                    }
                });
            }
        }
    }

    /// Handles events until the session terminates or the transport channel
    /// closes.
    ///
    /// Each transport event is fully handled, including any dial request it
    /// triggers, before the next one is read. Acknowledgements still pending
    /// when the session ends are aborted.
    pub async fn run(mut self, events: SessionEvents) -> Result<CallState, DialoutError> {
        let SessionEvents {
            mut transport_rx,
            mut client_rx,
        } = events;
        let mut client_open = true;

        while !self.state.is_terminal() {
            tokio::select! {
                event = transport_rx.recv() => match event {
                    Some(event) => {
                        self.handle_transport_event(event).await?;
                    }
                    None => {
                        debug!("transport event channel closed");
                        break;
                    }
                },
                event = client_rx.recv(), if client_open => match event {
                    Some(event) => self.handle_client_event(event),
                    None => client_open = false,
                },
                Some(joined) = self.ready_acks.join_next(), if !self.ready_acks.is_empty() => {
                    if let Err(e) = joined {
                        warn!("readiness task failed: {}", e);
                    }
                }
            }
        }

        Ok(self.state)
    }

    async fn terminate(&mut self) -> CallState {
        self.session.cancel().await;
        CallState::Terminated
    }

    fn set_state(&mut self, next: CallState) {
        if next != self.state {
            debug!(from = %self.state, to = %next, "call state transition");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }
}
