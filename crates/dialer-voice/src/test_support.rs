//! In-memory collaborators for unit tests.

use crate::error::TransportError;
use crate::session::SessionTask;
use crate::transport::{CallTransport, ClientReadiness};
use async_trait::async_trait;
use dialer_types::{DialoutTarget, Pathway};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) const TEST_SIP_URI: &str = "sip:+15551234567@dev.sip.example.com";

pub(crate) fn test_target() -> DialoutTarget {
    DialoutTarget::new(
        TEST_SIP_URI,
        Pathway {
            voicemail_message: "We will try again later.".to_string(),
            global_prompt: "You are a care navigator.".to_string(),
            segments: vec![],
        },
    )
}

/// Records every dial request it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    dialed: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub(crate) fn failing() -> Self {
        let transport = Self::default();
        transport.fail.store(true, Ordering::SeqCst);
        transport
    }

    pub(crate) fn dial_count(&self) -> usize {
        self.dialed.lock().unwrap().len()
    }

    pub(crate) fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallTransport for RecordingTransport {
    async fn start_dialout(&self, target: &DialoutTarget) -> Result<(), TransportError> {
        self.dialed.lock().unwrap().push(target.sip_uri().to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("dial-out API offline".to_string()));
        }
        Ok(())
    }
}

/// Counts cancellation requests.
#[derive(Debug, Default)]
pub(crate) struct CountingSession {
    cancels: AtomicUsize,
}

impl CountingSession {
    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionTask for CountingSession {
    async fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts readiness acknowledgements.
#[derive(Debug, Default)]
pub(crate) struct CountingReadiness {
    ready: AtomicUsize,
}

impl CountingReadiness {
    pub(crate) fn ready_count(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientReadiness for CountingReadiness {
    async fn set_ready(&self) -> Result<(), TransportError> {
        self.ready.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
