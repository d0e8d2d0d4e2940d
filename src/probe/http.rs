use crate::error::ProbeCancelled;
use crate::probe::{ProbeOutcome, Prober};
use log::debug;
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Probes sites with a timeout-bounded reqwest GET
///
/// Redirects are followed; the final response decides the status. The body is
/// never read.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Create a prober whose requests are bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    fn classify(result: Result<Response, reqwest::Error>, elapsed: Duration) -> ProbeOutcome {
        let duration_ms = elapsed.as_millis() as u64;

        match result {
            Ok(response) => {
                let headers: BTreeMap<String, String> = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        )
                    })
                    .collect();

                ProbeOutcome::from_status_code(response.status().as_u16(), duration_ms)
                    .with_headers(headers)
            }
            Err(e) if e.is_timeout() => ProbeOutcome::timed_out(duration_ms),
            Err(e) => ProbeOutcome::failed(error_chain(&e), duration_ms),
        }
    }
}

/// Render an error with all of its causes, outermost first
///
/// reqwest's top-level message names only the request; the connect, DNS or
/// TLS failure is in its sources. Causes already quoted by an outer message
/// are not repeated.
fn error_chain(err: &dyn Error) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        let part = inner.to_string();
        if !part.is_empty() && !text.contains(&part) {
            text.push_str(": ");
            text.push_str(&part);
        }
        cause = inner.source();
    }
    text
}

impl Prober for HttpProber {
    fn probe<'a>(
        &'a self,
        url: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<ProbeOutcome, ProbeCancelled>> + Send + 'a>> {
        Box::pin(async move {
            let started = Instant::now();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProbeCancelled),
                result = self.client.get(url).send() => result,
            };

            let outcome = Self::classify(result, started.elapsed());
            debug!(
                "Probed {}: {} ({}) in {}ms",
                url, outcome.status, outcome.status_code, outcome.duration_ms
            );
            Ok(outcome)
        })
    }
}
