//! Probe engine: one bounded GET per monitored site
//!
//! A probe never fails in the error sense. Network failures, timeouts and
//! non-200 answers are all observations that classify the site as down.

use crate::error::ProbeCancelled;
use crate::records::Status;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// HTTP implementation backed by reqwest
pub mod http;

/// Scripted implementation for tests and dry runs
pub mod mock;

pub use http::HttpProber;
pub use mock::MockProber;

/// Error detail recorded when the request hit the probe timeout
pub const TIMEOUT_DETAIL: &str = "timeout";

/// Classified result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: Status,
    /// HTTP status code, 0 when no response arrived
    pub status_code: u16,
    pub duration_ms: u64,
    pub error_detail: Option<String>,
    /// Response headers, only surfaced to manual trigger callers
    pub headers: BTreeMap<String, String>,
}

impl ProbeOutcome {
    /// Outcome for a received response; only 200 counts as up
    pub fn from_status_code(status_code: u16, duration_ms: u64) -> Self {
        let status = if status_code == 200 {
            Status::Up
        } else {
            Status::Down
        };

        Self {
            status,
            status_code,
            duration_ms,
            error_detail: None,
            headers: BTreeMap::new(),
        }
    }

    /// Outcome for a request that exceeded the probe timeout
    pub fn timed_out(duration_ms: u64) -> Self {
        Self::failed(TIMEOUT_DETAIL, duration_ms)
    }

    /// Outcome for a request that never produced a response
    pub fn failed(detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: Status::Down,
            status_code: 0,
            duration_ms,
            error_detail: Some(detail.into()),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Trait for probe implementations
pub trait Prober: Send + Sync {
    /// Probe `url` once, without retries
    ///
    /// Returns `Err(ProbeCancelled)` only when `cancel` fires before the
    /// request completes; the partial observation is discarded.
    fn probe<'a>(
        &'a self,
        url: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<ProbeOutcome, ProbeCancelled>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_only_200_is_up() {
        assert_eq!(ProbeOutcome::from_status_code(200, 5).status, Status::Up);
        assert_eq!(ProbeOutcome::from_status_code(204, 5).status, Status::Down);
        assert_eq!(ProbeOutcome::from_status_code(301, 5).status, Status::Down);
        assert_eq!(ProbeOutcome::from_status_code(503, 5).status, Status::Down);
    }

    #[test]
    fn test_timed_out_outcome() {
        let outcome = ProbeOutcome::timed_out(30_000);
        assert_eq!(outcome.status, Status::Down);
        assert_eq!(outcome.status_code, 0);
        assert_eq!(outcome.error_detail.as_deref(), Some("timeout"));
        assert_eq!(outcome.duration_ms, 30_000);
    }

    #[quickcheck]
    fn prop_status_code_is_preserved(code: u16, duration: u64) -> bool {
        let outcome = ProbeOutcome::from_status_code(code, duration);
        outcome.status_code == code
            && outcome.duration_ms == duration
            && outcome.error_detail.is_none()
            && (outcome.status == Status::Up) == (code == 200)
    }
}
