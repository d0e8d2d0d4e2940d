use crate::alerts::sinks::{NotificationSink, SinkFuture};
use crate::error::NotifyError;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sink that records every message it is asked to deliver
///
/// Can be told to fail every delivery, to exercise the fire-and-forget path.
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    fail: bool,
    first_delay: Option<Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose deliveries always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Hold the first delivery for `delay` before recording it
    pub fn with_first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = Some(delay);
        self
    }

    /// Messages delivered so far, in delivery order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of deliveries attempted, failed ones included
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

impl NotificationSink for RecordingSink {
    fn send<'a>(&'a self, text: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                *attempts += 1;
                *attempts
            };

            if let (1, Some(delay)) = (attempt, self.first_delay) {
                tokio::time::sleep(delay).await;
            }

            if self.fail {
                return Err(NotifyError::NotificationFailed(
                    "recording sink set to fail".to_string(),
                ));
            }

            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        })
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
