use thiserror::Error;

/// Failures raised by a call transport while issuing a request.
///
/// These are infrastructure faults, distinct from a `on_dialout_error`
/// lifecycle event reported for a call that was placed but failed.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {endpoint} rejected with status {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid room URL: {0}")]
    InvalidRoom(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum DialoutError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Room provisioning failed: {0}")]
    Provision(String),

    #[error("session {0} is no longer accepting events")]
    SessionClosed(String),
}
