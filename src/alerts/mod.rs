//! Transition notifications
//!
//! The notifier decides when a status flip deserves a message; sinks decide
//! where the message goes.

/// Recording sink for tests
pub mod mock;
pub mod notifier;
/// Telegram and log-only sinks
pub mod sinks;

pub use mock::RecordingSink;
pub use notifier::{down_detail, format_message, Transition, TransitionNotifier};
pub use sinks::{LogSink, NotificationSink, SinkFuture, TelegramSink};
