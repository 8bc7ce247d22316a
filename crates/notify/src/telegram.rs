//! Notification sinks.

use async_trait::async_trait;
use factor_pulse_core::{NotificationSink, SinkError};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// # Errors
    /// Returns `SinkError::NotConfigured` when token or chat id is missing.
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Result<Self, SinkError> {
        let (bot_token, chat_id) = match (bot_token, chat_id) {
            (Some(t), Some(c)) if !t.is_empty() && !c.is_empty() => (t, c),
            _ => return Err(SinkError::NotConfigured),
        };
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Delivery(format!("http client: {e}")))?;
        Ok(Self {
            http,
            bot_token,
            chat_id,
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .http
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            .map_err(|e| SinkError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Delivery(format!("status {status}: {body}")));
        }
        Ok(())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Fallback sink that logs the digest instead of delivering it. Used when
/// Telegram is disabled so the gate state machine still exercises fully.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        info!("Digest (no sink configured):\n{text}");
        Ok(())
    }

    fn is_configured(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_not_configured() {
        assert!(matches!(
            TelegramNotifier::new(None, Some("123".to_string())),
            Err(SinkError::NotConfigured)
        ));
        assert!(matches!(
            TelegramNotifier::new(Some(String::new()), Some("123".to_string())),
            Err(SinkError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let sink = LogSink;
        assert!(sink.send("hello").await.is_ok());
        assert!(!sink.is_configured());
    }
}
