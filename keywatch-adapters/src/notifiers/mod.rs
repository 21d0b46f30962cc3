//! Notification channels.
//!
//! Every channel receives whole batches. The HTTP channels render a batch
//! into a single title and body, so one cycle produces one push per channel
//! no matter how many keys were flagged. The SMTP channel does the same
//! with one e-mail per batch.

mod log;
mod pushover;
mod slack;
mod smtp;
mod telegram;

pub use self::log::LogNotifier;
pub use pushover::PushoverNotifier;
pub use slack::SlackNotifier;
pub use smtp::{LettreMailer, MailSender, SmtpNotifier};
pub use telegram::TelegramNotifier;

use std::time::Duration;

use async_trait::async_trait;

use keywatch_types::{OutputMessage, Severity};

use crate::AdapterError;

/// Upper bound for a single delivery to an HTTP channel.
pub const MAX_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// A destination for output messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Kind of channel, e.g. `"pushover"`. Several instances may share it.
    fn name(&self) -> &str;

    /// Deliver a batch. An empty batch is a successful no-op.
    async fn output_messages(&self, messages: &[OutputMessage]) -> Result<(), AdapterError>;
}

/// How a channel marks up bold text and links, and what follows each
/// rendered message.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Markup {
    bold: fn(&str) -> String,
    link: fn(&str, &str) -> String,
    separator: &'static str,
}

pub(crate) const HTML_MARKUP: Markup = Markup {
    bold: html_bold,
    link: html_link,
    separator: "",
};

/// HTML for mail bodies, where newlines collapse.
pub(crate) const EMAIL_MARKUP: Markup = Markup {
    separator: "<br>",
    ..HTML_MARKUP
};

pub(crate) const SLACK_MARKUP: Markup = Markup {
    bold: slack_bold,
    link: slack_link,
    separator: "",
};

fn html_bold(text: &str) -> String {
    format!("<b>{text}</b>")
}

fn html_link(url: &str, text: &str) -> String {
    format!("<b><a href=\"{url}\">{text}</a></b>")
}

fn slack_bold(text: &str) -> String {
    format!("*{text}*")
}

fn slack_link(url: &str, text: &str) -> String {
    format!("*<{url}|{text}>*")
}

/// A batch rendered for a push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderedBatch {
    pub title: String,
    pub body: String,
}

/// Render a non-empty batch. The title follows the most severe message and
/// names the source of the first one.
pub(crate) fn render_batch(messages: &[OutputMessage], markup: Markup) -> Option<RenderedBatch> {
    let first = messages.first()?;
    let severity = messages.iter().map(|msg| msg.severity).max()?;

    let body = messages
        .iter()
        .map(|msg| render_message(msg, markup) + markup.separator)
        .collect();

    Some(RenderedBatch {
        title: title(severity, &first.source_name),
        body,
    })
}

fn render_message(msg: &OutputMessage, markup: Markup) -> String {
    let identifier = identifier(msg, markup);
    let icon = icon(msg.severity);

    if msg.detail.is_empty() {
        format!("{icon} {} {identifier}\n\n", msg.category)
    } else {
        format!("{icon} {} {identifier}: {}\n\n", msg.category, msg.detail)
    }
}

fn identifier(msg: &OutputMessage, markup: Markup) -> String {
    if !msg.identity_url.is_empty() {
        return (markup.link)(&msg.identity_url, &msg.short_identity_key);
    }
    if msg.short_identity_key.is_empty() {
        return String::new();
    }
    (markup.bold)(&msg.short_identity_key)
}

fn icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "✅",
        Severity::Warning => "⚠️",
        Severity::Error => "🚨",
    }
}

fn title(severity: Severity, source: &str) -> String {
    match severity {
        Severity::Info => format!("ⓘ Info for {source}"),
        Severity::Warning => format!("⚠️ Warnings occurred on {source}"),
        Severity::Error => format!("🚨 Problems occurred on {source}"),
    }
}
