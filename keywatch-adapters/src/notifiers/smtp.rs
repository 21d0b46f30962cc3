//! E-mail delivery over SMTP.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use keywatch_types::OutputMessage;

use super::{render_batch, Notifier, EMAIL_MARKUP, MAX_SEND_TIMEOUT};
use crate::AdapterError;

const MIME_HEADERS: &str = "MIME-version: 1.0;\nContent-Type: text/html; charset=\"UTF-8\";\n\n";

/// Hands a fully formatted message to a mail server.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, from: &str, to: &str, email: &[u8]) -> Result<(), AdapterError>;
}

/// [`MailSender`] on an authenticated STARTTLS connection.
pub struct LettreMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl LettreMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|err| AdapterError::Mail(err.to_string()))?
            .port(port)
            .credentials(Credentials::new(username.into(), password.into()))
            .timeout(Some(MAX_SEND_TIMEOUT))
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailSender for LettreMailer {
    async fn send(&self, from: &str, to: &str, email: &[u8]) -> Result<(), AdapterError> {
        let from: Address = from
            .parse()
            .map_err(|err| AdapterError::Mail(format!("sender {from:?}: {err}")))?;
        let to: Address = to
            .parse()
            .map_err(|err| AdapterError::Mail(format!("recipient {to:?}: {err}")))?;
        let envelope = Envelope::new(Some(from), vec![to])
            .map_err(|err| AdapterError::Mail(err.to_string()))?;

        self.transport
            .send_raw(&envelope, email)
            .await
            .map_err(|err| AdapterError::Mail(err.to_string()))?;
        Ok(())
    }
}

/// Sends each batch as one HTML e-mail.
pub struct SmtpNotifier {
    sender: Arc<dyn MailSender>,
    from: String,
    to: String,
}

impl SmtpNotifier {
    pub fn new(sender: Arc<dyn MailSender>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            sender,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Authenticates as `from` on `host:port`.
    pub fn with_server(
        host: &str,
        port: u16,
        from: impl Into<String>,
        password: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, AdapterError> {
        let from = from.into();
        let mailer = LettreMailer::new(host, port, from.clone(), password)?;
        Ok(Self::new(Arc::new(mailer), from, to))
    }
}

fn format_email(title: &str, body: &str) -> String {
    format!(
        "Subject: {title} \n{MIME_HEADERS}\n\n\
         <!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <body>\n   {body}\n</body>\n</html>\n"
    )
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn output_messages(&self, messages: &[OutputMessage]) -> Result<(), AdapterError> {
        tracing::debug!(notifier = "smtp", num_messages = messages.len(), "sending messages");
        let Some(batch) = render_batch(messages, EMAIL_MARKUP) else {
            return Ok(());
        };

        let email = format_email(&batch.title, &batch.body);
        self.sender.send(&self.from, &self.to, email.as_bytes()).await?;

        tracing::debug!(notifier = "smtp", to = %self.to, "sent notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifiers::tests::sample_batch;
    use keywatch_types::Severity;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct SentMail {
        from: String,
        to: String,
        email: String,
    }

    #[derive(Default)]
    struct StubSender {
        fail: bool,
        sent: Mutex<Vec<SentMail>>,
    }

    #[async_trait]
    impl MailSender for StubSender {
        async fn send(&self, from: &str, to: &str, email: &[u8]) -> Result<(), AdapterError> {
            if self.fail {
                return Err(AdapterError::Mail("535 authentication failed".to_string()));
            }
            self.sent.lock().unwrap().push(SentMail {
                from: from.to_string(),
                to: to.to_string(),
                email: String::from_utf8(email.to_vec()).unwrap(),
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let sender = Arc::new(StubSender::default());
        let notifier = SmtpNotifier::new(sender.clone(), "from@example.com", "to@example.com");

        notifier.output_messages(&[]).await.unwrap();

        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sends_html_email() {
        let sender = Arc::new(StubSender::default());
        let notifier = SmtpNotifier::new(sender.clone(), "from@example.com", "to@example.com");

        notifier
            .output_messages(&sample_batch(Severity::Info))
            .await
            .unwrap();

        let expected = "Subject: ⓘ Info for executor \n\
MIME-version: 1.0;\n\
Content-Type: text/html; charset=\"UTF-8\";\n\
\n\
\n\
\n\
<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<body>\n   \
✅ info1 <b><a href=\"https://examples.com/info3\">info3</a></b>: problem1\n\
\n\
<br>✅ info10 \n\
\n\
<br>✅  <b>info20</b>\n\
\n\
<br>\n\
</body>\n\
</html>\n";

        let sent = sender.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![SentMail {
                from: "from@example.com".to_string(),
                to: "to@example.com".to_string(),
                email: expected.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn subject_follows_most_severe_message() {
        let sender = Arc::new(StubSender::default());
        let notifier = SmtpNotifier::new(sender.clone(), "from@example.com", "to@example.com");

        notifier
            .output_messages(&sample_batch(Severity::Error))
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert!(sent[0]
            .email
            .starts_with("Subject: 🚨 Problems occurred on executor \n"));
        assert!(sent[0].email.contains("<br>🚨  <b>info20</b>\n\n<br>"));
    }

    #[tokio::test]
    async fn send_error_is_returned() {
        let sender = Arc::new(StubSender {
            fail: true,
            ..Default::default()
        });
        let notifier = SmtpNotifier::new(sender, "from@example.com", "to@example.com");

        let err = notifier
            .output_messages(&sample_batch(Severity::Warning))
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Mail(_)));
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected_before_connecting() {
        let mailer = LettreMailer::new("127.0.0.1", 1, "from@example.com", "pass").unwrap();

        let err = mailer
            .send("from@example.com", "not an address", b"Subject: x\n\n")
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::Mail(msg) if msg.contains("recipient")));
    }
}
