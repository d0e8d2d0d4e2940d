use crate::records::Timestamp;
use chrono::Utc;

/// Wall clock with seconds resolution
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    /// Current unix time in seconds
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp()
    }
}
