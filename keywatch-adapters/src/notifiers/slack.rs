//! Slack incoming webhooks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use keywatch_types::OutputMessage;

use super::{render_batch, Notifier, MAX_SEND_TIMEOUT, SLACK_MARKUP};
use crate::http::{HttpClient, HttpTransport};
use crate::AdapterError;

#[derive(Debug, Serialize)]
struct SlackRequest {
    text: String,
}

/// Posts each batch to a webhook. The secret is the webhook path below the
/// configured URL.
pub struct SlackNotifier {
    transport: Arc<dyn HttpTransport>,
    secret: String,
}

impl SlackNotifier {
    pub fn new(transport: Arc<dyn HttpTransport>, secret: impl Into<String>) -> Self {
        Self {
            transport,
            secret: secret.into(),
        }
    }

    pub fn with_url(url: &str, secret: impl Into<String>) -> Result<Self, AdapterError> {
        let client = HttpClient::builder()
            .base_url(url)
            .timeout(MAX_SEND_TIMEOUT)
            .build()?;
        Ok(Self::new(Arc::new(client), secret))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn output_messages(&self, messages: &[OutputMessage]) -> Result<(), AdapterError> {
        tracing::debug!(notifier = "slack", num_messages = messages.len(), "sending messages");
        let Some(batch) = render_batch(messages, SLACK_MARKUP) else {
            return Ok(());
        };

        let request = SlackRequest {
            text: format!("{}\n\n{}", batch.title, batch.body),
        };
        let body = serde_json::to_vec(&request)?;

        let response = self
            .transport
            .post(&CancellationToken::new(), &self.secret, body)
            .await?
            .error_for_status()?;

        tracing::debug!(notifier = "slack", status = response.status, "sent notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifiers::tests::sample_batch;
    use crate::test_support::StubTransport;
    use keywatch_types::Severity;

    #[tokio::test]
    async fn posts_text_to_secret_path() {
        let transport = Arc::new(StubTransport::replying(200, "ok"));
        let notifier = SlackNotifier::new(transport.clone(), "T000/B000/XXXX");

        notifier
            .output_messages(&sample_batch(Severity::Info))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, "T000/B000/XXXX");
        assert_eq!(
            requests[0].json(),
            serde_json::json!({
                "text": "ⓘ Info for executor\n\n\
                         ✅ info1 *<https://examples.com/info3|info3>*: problem1\n\n\
                         ✅ info10 \n\n\
                         ✅  *info20*\n\n"
            })
        );
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let transport = Arc::new(StubTransport::replying(200, "ok"));
        let notifier = SlackNotifier::new(transport.clone(), "secret");

        notifier.output_messages(&[]).await.unwrap();

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn non_2xx_status_fails() {
        let transport = Arc::new(StubTransport::replying(403, "invalid_token"));
        let notifier = SlackNotifier::new(transport, "secret");

        let err = notifier
            .output_messages(&sample_batch(Severity::Error))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Status(403)));
    }
}
