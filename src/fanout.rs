//! Delivery of message batches to every notification channel.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use keywatch_adapters::Notifier;
use keywatch_types::OutputMessage;

use crate::MonitorError;

/// Smallest accepted delay between two delivery attempts.
pub const MIN_TIME_BETWEEN_RETRIES: Duration = Duration::from_millis(10);

/// Sends each batch to all registered channels and retries the ones that
/// failed.
///
/// Channels are tracked by registration index, so two channels reporting the
/// same name are still retried independently.
pub struct NotificationFanout {
    notifiers: Vec<Arc<dyn Notifier>>,
    num_retries: u32,
    time_between_retries: Duration,
}

impl NotificationFanout {
    pub fn new(
        notifiers: Vec<Arc<dyn Notifier>>,
        num_retries: u32,
        time_between_retries: Duration,
    ) -> Result<Self, MonitorError> {
        if time_between_retries < MIN_TIME_BETWEEN_RETRIES {
            return Err(MonitorError::InvalidTimeBetweenRetries(
                time_between_retries,
                MIN_TIME_BETWEEN_RETRIES,
            ));
        }

        Ok(Self {
            notifiers,
            num_retries,
            time_between_retries,
        })
    }

    pub fn num_notifiers(&self) -> usize {
        self.notifiers.len()
    }

    /// Deliver `messages` to every channel.
    ///
    /// Channels that fail are retried, alone, up to `num_retries` times with
    /// a fixed delay in between. Returns an error naming how many channels
    /// were still failing after the last attempt.
    pub async fn notify_with_retry(
        &self,
        caller: &str,
        messages: &[OutputMessage],
    ) -> Result<(), MonitorError> {
        tracing::debug!(
            executor = caller,
            num_messages = messages.len(),
            num_retries = self.num_retries,
            num_notifiers = self.notifiers.len(),
            "notifying"
        );
        if messages.is_empty() {
            return Ok(());
        }

        let mut failed = BTreeSet::new();
        for (index, notifier) in self.notifiers.iter().enumerate() {
            if let Err(err) = notifier.output_messages(messages).await {
                tracing::error!(
                    notifier = %label(notifier.as_ref(), index),
                    error = %err,
                    "error sending notification"
                );
                failed.insert(index);
            }
        }

        for retry in 0..self.num_retries {
            if failed.is_empty() {
                return Ok(());
            }
            tokio::time::sleep(self.time_between_retries).await;
            self.retry_failed(retry, &mut failed, messages).await;
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(MonitorError::NotificationsSendingProblems(failed.len()))
        }
    }

    async fn retry_failed(
        &self,
        retry: u32,
        failed: &mut BTreeSet<usize>,
        messages: &[OutputMessage],
    ) {
        let pending: Vec<usize> = failed.iter().copied().collect();
        for index in pending {
            let notifier = &self.notifiers[index];
            match notifier.output_messages(messages).await {
                Ok(()) => {
                    failed.remove(&index);
                }
                Err(err) => tracing::error!(
                    notifier = %label(notifier.as_ref(), index),
                    retry,
                    error = %err,
                    "error sending notification"
                ),
            }
        }
    }
}

fn label(notifier: &dyn Notifier, index: usize) -> String {
    format!("{}#{index}", notifier.name())
}
