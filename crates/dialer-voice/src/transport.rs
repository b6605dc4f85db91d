//! Capabilities the dial-out core consumes from its collaborators.
//!
//! The core never talks to a media server directly. It places calls through
//! a [`CallTransport`], acknowledges UI readiness through a
//! [`ClientReadiness`] signal, and stops the session through a
//! [`SessionTask`](crate::session::SessionTask). Lifecycle events flow the
//! other way over the channels in [`crate::events`].

use crate::error::TransportError;
use async_trait::async_trait;
use dialer_types::DialoutTarget;

/// Issues outbound call requests on behalf of a session.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Requests a dial-out to `target`.
    ///
    /// Resolves once the transport has acknowledged the request. The outcome
    /// of the call itself arrives later as a lifecycle event.
    async fn start_dialout(&self, target: &DialoutTarget) -> Result<(), TransportError>;
}

/// Tells the connected client that the agent is ready.
#[async_trait]
pub trait ClientReadiness: Send + Sync {
    async fn set_ready(&self) -> Result<(), TransportError>;
}
