use async_trait::async_trait;

use keywatch_types::{OutputMessage, Severity};

use super::Notifier;
use crate::AdapterError;

/// Writes every message to the tracing subscriber. Always registered, so
/// alerts are visible in the logs even when no push channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn output_messages(&self, messages: &[OutputMessage]) -> Result<(), AdapterError> {
        for message in messages {
            let line = compose_line(message);
            match message.severity {
                Severity::Error => tracing::error!(notifier = "log", "{line}"),
                Severity::Warning => tracing::warn!(notifier = "log", "{line}"),
                Severity::Info => tracing::info!(notifier = "log", "{line}"),
            }
        }
        Ok(())
    }
}

fn compose_line(message: &OutputMessage) -> String {
    let mut line = String::new();
    if !message.category.is_empty() {
        line.push_str(&message.category);
        line.push(' ');
    }
    if !message.identity_key.is_empty() {
        line.push_str(&message.identity_key);
        line.push(' ');
    }
    if !message.detail.is_empty() {
        line.push_str("-> ");
        line.push_str(&message.detail);
        line.push(' ');
    }
    line.push_str("called by ");
    line.push_str(&message.source_name);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_all_parts() {
        let message = OutputMessage::builder(Severity::Error)
            .category("BLS key")
            .identity_key("abcdef")
            .short_identity_key("abc...def")
            .detail("Imminent jail")
            .source_name("mainnet")
            .build();

        assert_eq!(
            compose_line(&message),
            "BLS key abcdef -> Imminent jail called by mainnet"
        );
    }

    #[test]
    fn skips_empty_parts() {
        let message = OutputMessage::builder(Severity::Info)
            .source_name("app")
            .build();
        assert_eq!(compose_line(&message), "called by app");

        let message = OutputMessage::builder(Severity::Info)
            .category("Application started")
            .source_name("app")
            .build();
        assert_eq!(compose_line(&message), "Application started called by app");
    }

    #[tokio::test]
    async fn never_fails() {
        let notifier = LogNotifier::new();
        assert_eq!(notifier.name(), "log");
        assert!(notifier.output_messages(&[]).await.is_ok());

        let messages: Vec<_> = [Severity::Info, Severity::Warning, Severity::Error]
            .into_iter()
            .map(|severity| OutputMessage::builder(severity).source_name("test").build())
            .collect();
        assert!(notifier.output_messages(&messages).await.is_ok());
    }
}
