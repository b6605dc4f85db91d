//! Shared request and configuration types for the dialer platform.
//!
//! This crate defines the data that crosses the boundary into a dial-out
//! session: the agent start request, the dial-out settings it carries, and
//! the conversation pathway payload that is forwarded untouched to the media
//! pipeline.
//!
//! Everything here is plain data plus boundary validation and log redaction.
//! Nothing in this crate performs I/O, and the pathway graph is never interpreted: the
//! session core only needs the SIP address, the room URL and the token.

pub mod pathway;
pub mod redact;
pub mod request;

pub use pathway::{Edge, Node, Pathway, Segment};
pub use redact::{redact_payload, redact_sip_uri, redact_text};
pub use request::{AgentRequest, DialoutSettings, DialoutTarget, RequestError};

/// Default upper bound on dial-out attempts for a single session.
pub const DEFAULT_MAX_DIALOUT_ATTEMPTS: u32 = 5;
