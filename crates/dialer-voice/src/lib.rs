//! Outbound call sessions for the dialer platform.
//!
//! A session joins a media room, dials a SIP destination, and follows the
//! call until it is answered, abandoned, or the remote party hangs up.
//! Failed dial attempts are retried up to a fixed budget.
//!
//! The crate separates policy from plumbing:
//!
//! - [`DialoutController`] owns the retry budget and decides whether another
//!   attempt is allowed.
//! - [`SessionLifecycleCoordinator`] turns lifecycle events into controller
//!   calls and cancels the session when the call cannot proceed.
//! - [`CallTransport`], [`ClientReadiness`] and [`SessionTask`] are the
//!   capabilities the core consumes; [`DailyTransport`] implements the first
//!   two over the Daily REST API.
//!
//! Events reach a session over the channels in [`events`]; [`spawn_session`]
//! wires everything together on a dedicated task.

pub mod config;
pub mod controller;
pub mod coordinator;
pub mod daily;
pub mod error;
pub mod events;
pub mod provision;
pub mod runner;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::{DailyConfig, DEFAULT_DAILY_API_URL};
pub use controller::DialoutController;
pub use coordinator::{CallState, SessionLifecycleCoordinator};
pub use daily::{room_name_from_url, DailyClient, DailyTransport};
pub use error::{DialoutError, TransportError};
pub use events::{
    session_channels, ClientEvent, EventKind, EventSender, SessionEvent, SessionEvents,
    TransportEvent,
};
pub use provision::{ProvisionedRoom, RoomProvisioner, DEFAULT_ROOM_TTL};
pub use runner::{run_session, spawn_session, RunningSession, SessionControl};
pub use session::{SessionHandle, SessionTask};
pub use transport::{CallTransport, ClientReadiness};
