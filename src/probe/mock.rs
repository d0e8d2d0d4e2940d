use crate::error::ProbeCancelled;
use crate::probe::{ProbeOutcome, Prober};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Prober that replays scripted outcomes per URL
///
/// Outcomes for a URL are returned in order; the last one repeats once the
/// script runs out. URLs without a script answer with HTTP 200.
#[derive(Clone, Default)]
pub struct MockProber {
    scripts: Arc<Mutex<HashMap<String, VecDeque<ProbeOutcome>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for `url`
    pub fn respond(self, url: &str, outcome: ProbeOutcome) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Sleep before answering, honoring cancellation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs probed so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_outcome(&self, url: &str) -> ProbeOutcome {
        let mut scripts = self.scripts.lock().unwrap();
        let scripted = match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        scripted.unwrap_or_else(|| ProbeOutcome::from_status_code(200, 1))
    }
}

impl Prober for MockProber {
    fn probe<'a>(
        &'a self,
        url: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<ProbeOutcome, ProbeCancelled>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(url.to_string());

            if let Some(delay) = self.delay {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ProbeCancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            } else if cancel.is_cancelled() {
                return Err(ProbeCancelled);
            }

            Ok(self.next_outcome(url))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Status;

    #[tokio::test]
    async fn test_script_replays_then_repeats_last() {
        let prober = MockProber::new()
            .respond("https://a.example", ProbeOutcome::from_status_code(200, 10))
            .respond("https://a.example", ProbeOutcome::timed_out(30_000));
        let cancel = CancellationToken::new();

        let first = prober.probe("https://a.example", &cancel).await.unwrap();
        let second = prober.probe("https://a.example", &cancel).await.unwrap();
        let third = prober.probe("https://a.example", &cancel).await.unwrap();

        assert_eq!(first.status, Status::Up);
        assert_eq!(second.error_detail.as_deref(), Some("timeout"));
        assert_eq!(third, second);
        assert_eq!(prober.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_url_is_up() {
        let prober = MockProber::new();
        let outcome = prober
            .probe("https://unscripted.example", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, Status::Up);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let prober = MockProber::new().with_delay(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(
            prober.probe("https://a.example", &cancel).await,
            Err(ProbeCancelled)
        );
    }
}
