use crate::error::DialoutError;
use crate::transport::CallTransport;
use dialer_types::{redact_sip_uri, DialoutTarget, DEFAULT_MAX_DIALOUT_ATTEMPTS};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, error, info};

const DEFAULT_MAX_ATTEMPTS: NonZeroU32 = match NonZeroU32::new(DEFAULT_MAX_DIALOUT_ATTEMPTS) {
    Some(max_attempts) => max_attempts,
    None => panic!("default dial-out budget must be non-zero"),
};

/// Retry policy and attempt accounting for a single outbound call.
///
/// The controller decides whether another dial attempt is allowed; callers
/// decide when to ask. It issues at most `max_attempts` dial requests and none
/// at all once the call has been answered.
pub struct DialoutController {
    transport: Arc<dyn CallTransport>,
    target: DialoutTarget,
    max_attempts: NonZeroU32,
    attempt_count: u32,
    succeeded: bool,
}

impl fmt::Debug for DialoutController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialoutController")
            .field("sip_uri", &redact_sip_uri(self.target.sip_uri()))
            .field("max_attempts", &self.max_attempts)
            .field("attempt_count", &self.attempt_count)
            .field("succeeded", &self.succeeded)
            .finish_non_exhaustive()
    }
}

impl DialoutController {
    /// Creates a controller allowing the default number of attempts.
    pub fn new(transport: Arc<dyn CallTransport>, target: DialoutTarget) -> Self {
        Self::with_max_attempts(transport, target, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(
        transport: Arc<dyn CallTransport>,
        target: DialoutTarget,
        max_attempts: NonZeroU32,
    ) -> Self {
        Self {
            transport,
            target,
            max_attempts,
            attempt_count: 0,
            succeeded: false,
        }
    }

    /// Starts a dial-out if the budget allows and the call is not yet answered.
    ///
    /// Returns `Ok(true)` when a dial request was issued, `Ok(false)` when the
    /// attempt was refused. A failure to issue the request is returned as an
    /// error; the attempt still counts against the budget.
    pub async fn attempt_dialout(&mut self) -> Result<bool, DialoutError> {
        if self.attempt_count >= self.max_attempts.get() {
            error!(
                max_attempts = self.max_attempts.get(),
                sip_uri = %redact_sip_uri(self.target.sip_uri()),
                "maximum dial-out attempts reached, giving up"
            );
            return Ok(false);
        }

        if self.succeeded {
            debug!("dial-out already answered, skipping attempt");
            return Ok(false);
        }

        self.attempt_count += 1;
        info!(
            attempt = self.attempt_count,
            max_attempts = self.max_attempts.get(),
            sip_uri = %redact_sip_uri(self.target.sip_uri()),
            "attempting dial-out"
        );

        self.transport.start_dialout(&self.target).await?;
        Ok(true)
    }

    /// Records that the call was answered. Further attempts are refused.
    pub fn mark_successful(&mut self) {
        self.succeeded = true;
    }

    pub fn should_retry(&self) -> bool {
        self.attempt_count < self.max_attempts.get() && !self.succeeded
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn target(&self) -> &DialoutTarget {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::test_support::{test_target, RecordingTransport, TEST_SIP_URI};
    use tracing_test::traced_test;

    fn controller(transport: &Arc<RecordingTransport>, max_attempts: u32) -> DialoutController {
        DialoutController::with_max_attempts(
            transport.clone(),
            test_target(),
            NonZeroU32::new(max_attempts).unwrap(),
        )
    }

    #[tokio::test]
    async fn default_budget_is_five_attempts() {
        let transport = Arc::new(RecordingTransport::default());
        let mut controller = DialoutController::new(transport.clone(), test_target());
        assert_eq!(controller.max_attempts(), 5);

        while controller.attempt_dialout().await.unwrap() {}
        assert_eq!(transport.dial_count(), 5);
    }

    #[tokio::test]
    async fn attempts_are_bounded_for_any_budget() {
        for max_attempts in 1..=8 {
            let transport = Arc::new(RecordingTransport::default());
            let mut controller = controller(&transport, max_attempts);

            for expected in 1..=max_attempts {
                assert!(controller.attempt_dialout().await.unwrap());
                assert_eq!(controller.attempt_count(), expected);
            }

            assert!(
                !controller.attempt_dialout().await.unwrap(),
                "attempt {} should be refused",
                max_attempts + 1
            );
            assert_eq!(controller.attempt_count(), max_attempts);
            assert_eq!(transport.dial_count(), max_attempts as usize);
        }
    }

    #[tokio::test]
    async fn each_attempt_dials_the_fixed_target() {
        let transport = Arc::new(RecordingTransport::default());
        let mut controller = controller(&transport, 3);

        controller.attempt_dialout().await.unwrap();
        controller.attempt_dialout().await.unwrap();
        assert_eq!(transport.dialed(), vec![TEST_SIP_URI, TEST_SIP_URI]);
    }

    #[tokio::test]
    async fn no_attempt_after_success() {
        let transport = Arc::new(RecordingTransport::default());
        let mut controller = controller(&transport, 5);

        assert!(controller.attempt_dialout().await.unwrap());
        controller.mark_successful();

        for _ in 0..3 {
            assert!(!controller.attempt_dialout().await.unwrap());
        }
        assert_eq!(transport.dial_count(), 1);
        assert_eq!(controller.attempt_count(), 1);
    }

    #[tokio::test]
    async fn success_before_any_attempt_blocks_dialing() {
        let transport = Arc::new(RecordingTransport::default());
        let mut controller = controller(&transport, 5);

        controller.mark_successful();
        assert!(!controller.attempt_dialout().await.unwrap());
        assert_eq!(transport.dial_count(), 0);
    }

    #[test]
    fn mark_successful_is_idempotent() {
        let transport = Arc::new(RecordingTransport::default());
        let mut once = controller(&transport, 5);
        let mut twice = controller(&transport, 5);

        once.mark_successful();
        twice.mark_successful();
        twice.mark_successful();

        assert_eq!(once.succeeded(), twice.succeeded());
        assert_eq!(once.attempt_count(), twice.attempt_count());
        assert_eq!(once.should_retry(), twice.should_retry());
    }

    #[tokio::test]
    async fn should_retry_matches_budget_and_success() {
        for max_attempts in 1..=4u32 {
            for attempts in 0..=max_attempts {
                for succeeded in [false, true] {
                    let transport = Arc::new(RecordingTransport::default());
                    let mut controller = controller(&transport, max_attempts);
                    for _ in 0..attempts {
                        controller.attempt_dialout().await.unwrap();
                    }
                    if succeeded {
                        controller.mark_successful();
                    }

                    let expected = attempts < max_attempts && !succeeded;
                    assert_eq!(
                        controller.should_retry(),
                        expected,
                        "max={max_attempts} attempts={attempts} succeeded={succeeded}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn transport_failure_propagates_and_consumes_an_attempt() {
        let transport = Arc::new(RecordingTransport::failing());
        let mut controller = controller(&transport, 2);

        let err = controller.attempt_dialout().await.unwrap_err();
        assert!(matches!(
            err,
            DialoutError::Transport(TransportError::Unavailable(_))
        ));
        assert_eq!(controller.attempt_count(), 1);
        assert!(controller.should_retry());
    }

    #[tokio::test]
    #[traced_test]
    async fn exhausted_budget_is_reported_in_logs() {
        let transport = Arc::new(RecordingTransport::default());
        let mut controller = controller(&transport, 1);

        controller.attempt_dialout().await.unwrap();
        assert!(logs_contain("attempting dial-out"));

        assert!(!controller.attempt_dialout().await.unwrap());
        assert!(logs_contain("maximum dial-out attempts reached, giving up"));
    }

    #[tokio::test]
    #[traced_test]
    async fn dialed_number_never_reaches_the_logs() {
        let transport = Arc::new(RecordingTransport::default());
        let mut controller = controller(&transport, 1);

        controller.attempt_dialout().await.unwrap();
        controller.attempt_dialout().await.unwrap();

        assert!(logs_contain("sip:***@dev.sip.example.com"));
        assert!(!logs_contain("5551234567"));
        assert!(!format!("{:?}", controller).contains("5551234567"));
    }
}
