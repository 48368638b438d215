//! Webhook rendering and delivery
//!
//! A notifier's kind decides how a plain text message is wrapped before it
//! is posted. Only the text webhook kind (`discord`, alias `webhook`) is
//! supported; it posts `{"content": "<message>"}`.

use crate::config::NotifierConfig;
use crate::error::ButterbotError;
use crate::notify::NotifierRegistry;
use crate::telemetry;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Delivery kind of a notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    /// Webhook taking a JSON body with a single `content` string
    TextWebhook,
}

impl NotifierKind {
    /// Parse a configured notifier type, `None` when unsupported
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.to_ascii_lowercase().as_str() {
            "discord" | "webhook" => Some(Self::TextWebhook),
            _ => None,
        }
    }

    /// Render the provider payload for a message
    pub fn render(&self, message: &str) -> String {
        match self {
            Self::TextWebhook => serde_json::json!({ "content": message }).to_string(),
        }
    }
}

/// Response of a webhook POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, kept for diagnostics
    pub body: String,
}

/// Outward boundary of the dispatcher
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// POST `body` to `url` with the given content type.
    ///
    /// Returns `ButterbotError::Delivery` only when the request could not be
    /// sent at all; any received response is returned as `Ok`.
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<PostResponse, ButterbotError>;
}

/// [`NotificationSink`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestSink {
    client: Client,
}

impl ReqwestSink {
    /// Create a sink whose requests time out after `timeout`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(timeout: Duration) -> Result<Self, ButterbotError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationSink for ReqwestSink {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<PostResponse, ButterbotError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| ButterbotError::Delivery(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(PostResponse { status, body })
    }
}

/// Renders messages for notifiers and posts them through a sink
#[derive(Clone)]
pub struct WebhookDispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl WebhookDispatcher {
    /// Create a dispatcher delivering through `sink`
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Deliver `message` to one notifier.
    ///
    /// Unsupported kinds and unexpected response codes are logged and
    /// reported as success.
    ///
    /// # Errors
    ///
    /// Returns `ButterbotError::Delivery` if the POST could not be sent
    pub async fn dispatch(
        &self,
        notifier: &NotifierConfig,
        message: &str,
    ) -> Result<(), ButterbotError> {
        let Some(kind) = NotifierKind::parse(&notifier.kind) else {
            warn!(
                notifier = %notifier.name,
                kind = %notifier.kind,
                "Notifier type is not supported, expecting [discord]"
            );
            telemetry::record_notification("skipped");
            return Ok(());
        };

        let body = kind.render(message);
        let response = match self
            .sink
            .post(&notifier.url, &notifier.content_type, body)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                telemetry::record_notification("failed");
                return Err(e);
            }
        };

        if response.status != notifier.status_code {
            warn!(
                notifier = %notifier.name,
                kind = %notifier.kind,
                status = response.status,
                expected = notifier.status_code,
                response = %response.body,
                "Webhook delivery failed"
            );
            telemetry::record_notification("rejected");
        } else {
            debug!(notifier = %notifier.name, "Webhook delivered");
            telemetry::record_notification("delivered");
        }

        Ok(())
    }

    /// Deliver `message` to every notifier named in `names`, in order.
    ///
    /// Every name that resolves gets its own delivery; the list is not cut
    /// short at the first notifier found, so a check listing `[ops, dev]`
    /// alerts both. Unknown names are skipped. A failed delivery is logged
    /// and does not stop delivery to the remaining notifiers. Returns the
    /// number of notifiers the message was handed to.
    pub async fn notify(&self, registry: &NotifierRegistry, names: &[String], message: &str) -> usize {
        let mut sent = 0;
        for notifier in registry.resolve(names) {
            match self.dispatch(notifier, message).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!(
                        notifier = %notifier.name,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }
        sent
    }
}
