use crate::config::TelegramConfig;
use crate::error::NotifyError;
use log::{debug, info};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by [`NotificationSink::send`]
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + 'a>>;

/// Destination for transition notifications
pub trait NotificationSink: Send + Sync {
    /// Deliver one message
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` if the destination rejected or never received
    /// the message.
    fn send<'a>(&'a self, text: &'a str) -> SinkFuture<'a>;

    /// Whether the sink has the credentials it needs to deliver anything
    fn is_configured(&self) -> bool;

    /// Short name used in logs and the self-check report
    fn name(&self) -> &'static str;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram Bot API sink using `sendMessage`
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramSink {
    /// Create a sink from the `[notify.telegram]` section
    ///
    /// # Arguments
    ///
    /// * `config` - Bot token, chat id and API base URL
    /// * `timeout` - Upper bound for each delivery request
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::HttpError` if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

impl NotificationSink for TelegramSink {
    fn send<'a>(&'a self, text: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            if !self.is_configured() {
                debug!("Telegram credentials missing, dropping notification");
                return Ok(());
            }

            let response = self
                .client
                .post(self.endpoint())
                .json(&SendMessage {
                    chat_id: &self.chat_id,
                    text,
                })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(NotifyError::NotificationFailed(format!(
                    "Telegram API returned {}: {}",
                    status, body
                )));
            }

            Ok(())
        })
    }

    fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

/// Sink that only writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send<'a>(&'a self, text: &'a str) -> SinkFuture<'a> {
        Box::pin(async move {
            info!("NOTIFICATION: {}", text);
            Ok(())
        })
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
