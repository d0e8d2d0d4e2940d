use crate::alerts::sinks::NotificationSink;
use crate::records::Status;
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Telegram rejects messages longer than this
const MAX_MESSAGE_LEN: usize = 4096;

/// A change of status worth telling someone about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The site is up again
    Recovered,
    /// The site went down, or was first seen down
    WentDown,
}

impl Transition {
    /// Compare the previous latest status with a fresh observation
    ///
    /// Any difference counts, so a first observation (`previous` is
    /// `Unknown`) is always a transition.
    ///
    /// # Returns
    ///
    /// `None` when the status did not change
    pub fn detect(previous: Status, current: Status) -> Option<Self> {
        if previous == current {
            None
        } else if current == Status::Up {
            Some(Transition::Recovered)
        } else {
            Some(Transition::WentDown)
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Recovered => f.write_str("recovered"),
            Transition::WentDown => f.write_str("down"),
        }
    }
}

/// Why a site counts as down: the transport error, or the HTTP code it sent
pub fn down_detail(status_code: u16, error_detail: Option<&str>) -> String {
    match error_detail {
        Some(detail) if !detail.is_empty() => detail.to_string(),
        _ => format!("HTTP {}", status_code),
    }
}

/// Render the message text for a transition of monitor `name`
pub fn format_message(transition: Transition, name: &str, detail: &str) -> String {
    let text = match transition {
        Transition::Recovered => format!("✅ Site recovered: {}", name),
        Transition::WentDown => format!("🔴 Site down: {} ({})", name, detail),
    };
    truncate_text(&text, MAX_MESSAGE_LEN)
}

/// Truncate on a UTF-8 boundary, marking the cut with "..."
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.len() <= max_length {
        return text.to_string();
    }

    let mut cut = max_length.saturating_sub(3);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &text[..cut])
}

enum Job {
    Deliver {
        transition: Transition,
        monitor: String,
        text: String,
    },
    Flush(oneshot::Sender<()>),
}

/// Drain `jobs` one at a time until every sender is gone
async fn deliver_in_order(sink: Arc<dyn NotificationSink>, mut jobs: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Deliver {
                transition,
                monitor,
                text,
            } => {
                if let Err(e) = sink.send(&text).await {
                    error!("Failed to deliver {} notification for {}: {}", transition, monitor, e);
                }
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Raises a notification exactly when a monitor's status flips
///
/// Deliveries are queued to a single background worker, so a slow or failing
/// sink never blocks a sweep and messages reach the sink in the order the
/// transitions were observed. Failures are logged and dropped. Call
/// [`TransitionNotifier::flush`] before shutdown to let queued deliveries
/// finish.
pub struct TransitionNotifier {
    sink: Arc<dyn NotificationSink>,
    jobs: mpsc::UnboundedSender<Job>,
}

impl TransitionNotifier {
    /// Start the delivery worker for `sink`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        let (jobs, queue) = mpsc::unbounded_channel();
        tokio::spawn(deliver_in_order(Arc::clone(&sink), queue));
        Self { sink, jobs }
    }

    /// Whether the underlying sink can actually deliver anything
    pub fn sink_configured(&self) -> bool {
        self.sink.is_configured()
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Notify if `current` differs from `previous`
    ///
    /// # Arguments
    ///
    /// * `name` - Monitor name
    /// * `previous` - Latest status before the new record is appended
    /// * `current` - Freshly observed status
    /// * `detail` - Down reason used in the message text
    ///
    /// # Returns
    ///
    /// The transition that was queued, if any. Delivery happens in the
    /// background and its outcome is only logged.
    pub fn observe(
        &self,
        name: &str,
        previous: Status,
        current: Status,
        detail: &str,
    ) -> Option<Transition> {
        let transition = Transition::detect(previous, current)?;
        info!("{}: {} -> {} ({})", name, previous, current, transition);

        let job = Job::Deliver {
            transition,
            monitor: name.to_string(),
            text: format_message(transition, name, detail),
        };
        if self.jobs.send(job).is_err() {
            warn!("Notification worker is gone, dropping {} notification for {}", transition, name);
        }

        Some(transition)
    }

    /// Wait until every delivery queued so far has been attempted
    pub async fn flush(&self) {
        let (done, flushed) = oneshot::channel();
        if self.jobs.send(Job::Flush(done)).is_err() || flushed.await.is_err() {
            warn!("Notification worker is gone, pending deliveries were dropped");
        }
    }
}
