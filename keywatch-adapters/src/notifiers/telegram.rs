//! Telegram bot messages.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use keywatch_types::OutputMessage;

use super::{render_batch, Notifier, HTML_MARKUP, MAX_SEND_TIMEOUT};
use crate::http::{HttpClient, HttpTransport};
use crate::AdapterError;

/// Sends each batch through the bot API `sendMessage` method, HTML parse
/// mode. Everything travels in the query string.
pub struct TelegramNotifier {
    transport: Arc<dyn HttpTransport>,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn with_url(
        url: &str,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let client = HttpClient::builder()
            .base_url(url)
            .timeout(MAX_SEND_TIMEOUT)
            .build()?;
        Ok(Self::new(Arc::new(client), token, chat_id))
    }

    fn endpoint(&self, text: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("chat_id", &self.chat_id)
            .append_pair("parse_mode", "html")
            .append_pair("text", text)
            .finish();
        format!("bot{}/sendMessage?{query}", self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn output_messages(&self, messages: &[OutputMessage]) -> Result<(), AdapterError> {
        tracing::debug!(notifier = "telegram", num_messages = messages.len(), "sending messages");
        let Some(batch) = render_batch(messages, HTML_MARKUP) else {
            return Ok(());
        };

        let endpoint = self.endpoint(&format!("{}\n\n{}", batch.title, batch.body));
        let response = self
            .transport
            .post(&CancellationToken::new(), &endpoint, Vec::new())
            .await?
            .error_for_status()?;

        tracing::debug!(notifier = "telegram", status = response.status, "sent notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubTransport;
    use keywatch_types::Severity;

    #[test]
    fn endpoint_encodes_query() {
        let notifier = TelegramNotifier::new(
            Arc::new(StubTransport::replying(200, "")),
            "123:abc",
            "-100",
        );

        assert_eq!(
            notifier.endpoint("a b&c"),
            "bot123:abc/sendMessage?chat_id=-100&parse_mode=html&text=a+b%26c"
        );
    }

    #[tokio::test]
    async fn posts_empty_body_with_text_in_query() {
        let transport = Arc::new(StubTransport::replying(200, r#"{"ok":true}"#));
        let notifier = TelegramNotifier::new(transport.clone(), "token", "chat");
        let messages = vec![OutputMessage::builder(Severity::Info)
            .category("Application started")
            .source_name("keywatch")
            .build()];

        notifier.output_messages(&messages).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.is_empty());
        assert!(requests[0]
            .endpoint
            .starts_with("bottoken/sendMessage?chat_id=chat&parse_mode=html&text="));

        let query = requests[0].endpoint.split_once('?').unwrap().1;
        let text = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "text")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        assert_eq!(
            text,
            "ⓘ Info for keywatch\n\n✅ Application started \n\n"
        );
    }

    #[tokio::test]
    async fn non_2xx_status_fails() {
        let transport = Arc::new(StubTransport::replying(401, ""));
        let notifier = TelegramNotifier::new(transport, "token", "chat");
        let messages = vec![OutputMessage::builder(Severity::Error).build()];

        let err = notifier.output_messages(&messages).await.unwrap_err();
        assert!(matches!(err, AdapterError::Status(401)));
    }
}
