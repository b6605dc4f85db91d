use async_trait::async_trait;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::info;

/// The running session, as seen by the lifecycle coordinator.
#[async_trait]
pub trait SessionTask: Send + Sync {
    /// Requests that the session stop.
    ///
    /// Fire-and-forget: returns without waiting for teardown. Calling it more
    /// than once is a no-op.
    async fn cancel(&self);
}

/// Cancellation handle for a dial-out session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    token: CancellationToken,
}

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the session has been cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[async_trait]
impl SessionTask for SessionHandle {
    async fn cancel(&self) {
        if !self.token.is_cancelled() {
            info!(session_id = %self.id, "session cancellation requested");
        }
        self.token.cancel();
    }
}
