use crate::controller::DialoutController;
use crate::coordinator::{CallState, SessionLifecycleCoordinator};
use crate::error::DialoutError;
use crate::events::{session_channels, EventSender, SessionEvents, DEFAULT_EVENT_CHANNEL_CAPACITY};
use crate::session::{SessionHandle, SessionTask};
use crate::transport::{CallTransport, ClientReadiness};
use dialer_types::{redact_sip_uri, redact_text, DialoutTarget};
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The parts of a running session that callers outside its task use.
#[derive(Debug, Clone)]
pub struct SessionControl {
    pub handle: SessionHandle,
    pub events: EventSender,
    pub state: watch::Receiver<CallState>,
}

impl SessionControl {
    /// Current state; a cancelled session always reports `Terminated`.
    pub fn current_state(&self) -> CallState {
        if self.handle.is_cancelled() {
            CallState::Terminated
        } else {
            *self.state.borrow()
        }
    }
}

/// A dial-out session running on its own task.
#[derive(Debug)]
pub struct RunningSession {
    pub control: SessionControl,
    pub task: JoinHandle<Result<CallState, DialoutError>>,
}

/// Wires a controller and coordinator to fresh event channels and spawns the
/// session task.
pub fn spawn_session(
    session_id: impl Into<String>,
    target: DialoutTarget,
    transport: Arc<dyn CallTransport>,
    readiness: Arc<dyn ClientReadiness>,
    max_attempts: NonZeroU32,
) -> RunningSession {
    let session_id = session_id.into();
    let handle = SessionHandle::new(session_id.clone());
    let (events, receivers) = session_channels(session_id, DEFAULT_EVENT_CHANNEL_CAPACITY);

    let controller = DialoutController::with_max_attempts(transport, target, max_attempts);
    let coordinator =
        SessionLifecycleCoordinator::new(controller, Arc::new(handle.clone()), readiness);
    let state = coordinator.subscribe_state();

    let task = tokio::spawn(run_session(coordinator, receivers, handle.clone()));

    RunningSession {
        control: SessionControl {
            handle,
            events,
            state,
        },
        task,
    }
}

/// Owns a session until it terminates, is cancelled, or fails.
///
/// A transport failure ends the session: the error is logged, the session is
/// cancelled and the error is returned.
pub async fn run_session(
    coordinator: SessionLifecycleCoordinator,
    events: SessionEvents,
    handle: SessionHandle,
) -> Result<CallState, DialoutError> {
    info!(
        session_id = %handle.id(),
        sip_uri = %redact_sip_uri(coordinator.controller().target().sip_uri()),
        max_attempts = coordinator.controller().max_attempts(),
        "starting dial-out session"
    );

    let result = tokio::select! {
        result = coordinator.run(events) => result,
        () = handle.cancelled() => Ok(CallState::Terminated),
    };

    match &result {
        Ok(state) => info!(session_id = %handle.id(), %state, "dial-out session ended"),
        Err(e) => error!(
            session_id = %handle.id(),
            "dial-out session failed: {}",
            redact_text(&e.to_string())
        ),
    }

    handle.cancel().await;
    result
}
