//! Pushover push notifications.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use keywatch_types::OutputMessage;

use super::{render_batch, Notifier, HTML_MARKUP, MAX_SEND_TIMEOUT};
use crate::http::{HttpClient, HttpTransport};
use crate::AdapterError;

#[derive(Debug, Serialize)]
struct PushoverRequest<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
    html: u8,
}

#[derive(Debug, Deserialize)]
struct PushoverResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    request: String,
}

/// Sends each batch as one HTML formatted Pushover message.
pub struct PushoverNotifier {
    transport: Arc<dyn HttpTransport>,
    token: String,
    user_key: String,
}

impl PushoverNotifier {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token: token.into(),
            user_key: user_key.into(),
        }
    }

    /// Notifier posting to the messages endpoint at `url`.
    pub fn with_url(
        url: &str,
        token: impl Into<String>,
        user_key: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let client = HttpClient::builder()
            .base_url(url)
            .timeout(MAX_SEND_TIMEOUT)
            .build()?;
        Ok(Self::new(Arc::new(client), token, user_key))
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    fn name(&self) -> &str {
        "pushover"
    }

    async fn output_messages(&self, messages: &[OutputMessage]) -> Result<(), AdapterError> {
        tracing::debug!(notifier = "pushover", num_messages = messages.len(), "sending messages");
        let Some(batch) = render_batch(messages, HTML_MARKUP) else {
            return Ok(());
        };

        let request = PushoverRequest {
            token: &self.token,
            user: &self.user_key,
            title: &batch.title,
            message: &batch.body,
            html: 1,
        };
        let body = serde_json::to_vec(&request)?;

        let response = self
            .transport
            .post(&CancellationToken::new(), "", body)
            .await?
            .error_for_status()?;
        let response: PushoverResponse = serde_json::from_slice(&response.body)?;

        tracing::debug!(
            notifier = "pushover",
            status = response.status,
            request_id = %response.request,
            "sent notification"
        );
        Ok(())
    }
}
