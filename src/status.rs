//! Application self-check.
//!
//! The status handler counts the errors hit by every monitor and the keys
//! they flagged. When its trigger fires it reports both numbers and starts
//! over. It also announces application start and shutdown.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use keywatch_types::{OutputMessage, Severity};

use crate::fanout::NotificationFanout;
use crate::poller::CycleExecutor;
use crate::MonitorError;

const STATUS_HANDLER_NAME: &str = "statusHandler";

/// Clock returning local wall-clock time.
pub type LocalTimeFn = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Local wall clock.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Sink for the outcome of monitoring cycles.
#[async_trait]
pub trait StatusReporter: CycleExecutor {
    /// Count a failed cycle.
    fn error_encountered(&self, err: &MonitorError);

    /// Remember the keys the messages are about.
    fn collect_keys_problems(&self, messages: &[OutputMessage]);

    async fn notify_app_start(&self);

    async fn send_close_message(&self);
}

#[derive(Debug, Default)]
struct AggregatedStatus {
    error_count: u32,
    flagged_keys: HashSet<String>,
}

/// Aggregates cycle outcomes and reports them through the fanout.
pub struct StatusHandler {
    name: String,
    fanout: Arc<NotificationFanout>,
    now: LocalTimeFn,
    status: Mutex<AggregatedStatus>,
}

impl StatusHandler {
    pub fn new(name: impl Into<String>, fanout: Arc<NotificationFanout>) -> Self {
        Self::with_clock(name, fanout, Arc::new(local_now))
    }

    pub fn with_clock(
        name: impl Into<String>,
        fanout: Arc<NotificationFanout>,
        now: LocalTimeFn,
    ) -> Self {
        Self {
            name: name.into(),
            fanout,
            now,
            status: Mutex::new(AggregatedStatus::default()),
        }
    }

    fn errors_message(&self, error_count: u32) -> OutputMessage {
        if error_count == 0 {
            return OutputMessage::builder(Severity::Info)
                .source_name(&self.name)
                .category("No application errors occurred")
                .build();
        }

        OutputMessage::builder(Severity::Warning)
            .source_name(&self.name)
            .short_identity_key(format!(
                "{error_count} application error(s) occurred, please check the app logs"
            ))
            .build()
    }

    fn keys_message(&self, num_flagged_keys: usize) -> OutputMessage {
        if num_flagged_keys == 0 {
            return OutputMessage::builder(Severity::Info)
                .source_name(&self.name)
                .category("All monitored keys are performing as expected")
                .build();
        }

        OutputMessage::builder(Severity::Warning)
            .source_name(&self.name)
            .short_identity_key(format!(
                "{num_flagged_keys} monitored key(s) encountered problems"
            ))
            .build()
    }

    async fn notify(&self, messages: &[OutputMessage]) {
        if let Err(err) = self
            .fanout
            .notify_with_retry(STATUS_HANDLER_NAME, messages)
            .await
        {
            tracing::warn!(error = %err, "status message delivery failed");
        }
    }
}

#[async_trait]
impl CycleExecutor for StatusHandler {
    /// Report and reset the counters. Delivery problems are logged, never
    /// returned.
    async fn execute(&self, _cancel: &CancellationToken) -> Result<(), MonitorError> {
        let drained = std::mem::take(&mut *self.status.lock());

        let messages = [
            self.errors_message(drained.error_count),
            self.keys_message(drained.flagged_keys.len()),
        ];
        self.notify(&messages).await;

        Ok(())
    }
}

#[async_trait]
impl StatusReporter for StatusHandler {
    fn error_encountered(&self, err: &MonitorError) {
        tracing::error!(error = %err, "error encountered");
        let mut status = self.status.lock();
        status.error_count = status.error_count.saturating_add(1);
    }

    fn collect_keys_problems(&self, messages: &[OutputMessage]) {
        let mut status = self.status.lock();
        for message in messages {
            status.flagged_keys.insert(message.identity_key.clone());
        }
    }

    async fn notify_app_start(&self) {
        let started = (self.now)().format("%m-%d-%Y %H:%M:%S").to_string();
        let message = OutputMessage::builder(Severity::Info)
            .source_name(&self.name)
            .category(format!("Application started on {started}"))
            .build();
        self.notify(&[message]).await;
    }

    async fn send_close_message(&self) {
        let message = OutputMessage::builder(Severity::Warning)
            .source_name(&self.name)
            .short_identity_key("Application closing")
            .build();
        self.notify(&[message]).await;
    }
}

/// Status reporter used when the self-check is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledStatusHandler;

#[async_trait]
impl CycleExecutor for DisabledStatusHandler {
    async fn execute(&self, _cancel: &CancellationToken) -> Result<(), MonitorError> {
        Ok(())
    }
}

#[async_trait]
impl StatusReporter for DisabledStatusHandler {
    fn error_encountered(&self, _err: &MonitorError) {}

    fn collect_keys_problems(&self, _messages: &[OutputMessage]) {}

    async fn notify_app_start(&self) {}

    async fn send_close_message(&self) {}
}
