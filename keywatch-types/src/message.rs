//! The alert envelope passed to every notification channel.

use alloc::string::String;
use core::fmt;

/// Severity of an output message.
///
/// The ordering is meaningful: channels that batch several messages title
/// the batch after the most severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Info = 3,
    Warning = 4,
    Error = 5,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single alert, immutable once built.
///
/// Key alerts fill every field. Status messages (self-check summaries,
/// start/close notices) only use some of them, and renderers skip empty
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputMessage {
    pub severity: Severity,

    /// What kind of identity this message is about (e.g. "BLS key"), or a
    /// free-form headline for status messages.
    pub category: String,

    /// The full hex-encoded identity key.
    pub identity_key: String,

    /// Abbreviated key used for display.
    pub short_identity_key: String,

    /// Explorer link for the identity, empty when unavailable.
    pub identity_url: String,

    /// Name of the monitor or application that produced the message.
    pub source_name: String,

    /// Problem description.
    pub detail: String,
}

impl OutputMessage {
    /// Create a builder for a message of the given severity.
    pub fn builder(severity: Severity) -> OutputMessageBuilder {
        OutputMessageBuilder::new(severity)
    }
}

/// Builder for [`OutputMessage`]. Unset fields stay empty.
#[derive(Debug, Clone)]
pub struct OutputMessageBuilder {
    message: OutputMessage,
}

impl OutputMessageBuilder {
    /// Create a new builder.
    pub fn new(severity: Severity) -> Self {
        Self {
            message: OutputMessage {
                severity,
                category: String::new(),
                identity_key: String::new(),
                short_identity_key: String::new(),
                identity_url: String::new(),
                source_name: String::new(),
                detail: String::new(),
            },
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.message.category = category.into();
        self
    }

    pub fn identity_key(mut self, key: impl Into<String>) -> Self {
        self.message.identity_key = key.into();
        self
    }

    pub fn short_identity_key(mut self, key: impl Into<String>) -> Self {
        self.message.short_identity_key = key.into();
        self
    }

    pub fn identity_url(mut self, url: impl Into<String>) -> Self {
        self.message.identity_url = url.into();
        self
    }

    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.message.source_name = name.into();
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.message.detail = detail.into();
        self
    }

    /// Build the message.
    pub fn build(self) -> OutputMessage {
        self.message
    }
}
