//! Operator alert delivery.
//!
//! The engine only needs `notify(subject, body)`. Delivery is best-effort:
//! a failing transport is reported back as [`NotifyError`] and recorded by
//! the caller, never propagated further.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("alert transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("alert delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Sink for operator alerts.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Writes alerts to the log at `warn` level. Used when no transport is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::warn!(subject, body, "alert: operator notification");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}

/// POSTs `{ "subject", "body" }` as JSON to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(&WebhookPayload { subject, body })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// The notifier selected by configuration.
#[derive(Debug, Clone)]
pub enum AlertChannel {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl AlertChannel {
    /// Webhook when a URL is configured, log otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the webhook client cannot be built.
    pub fn from_webhook_url(url: Option<&str>, timeout: Duration) -> Result<Self, NotifyError> {
        match url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url, timeout)?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for AlertChannel {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        match self {
            AlertChannel::Log(n) => n.notify(subject, body).await,
            AlertChannel::Webhook(n) => n.notify(subject, body).await,
        }
    }
}
