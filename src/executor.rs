//! One monitoring cycle: query, check, filter, notify.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use keywatch_adapters::{KeysFetcher, StatisticsQuerier};
use keywatch_types::{OutputMessage, ProblemRecord, Severity};

use crate::checker::RatingsCheck;
use crate::fanout::NotificationFanout;
use crate::poller::CycleExecutor;
use crate::snooze::KeysFilter;
use crate::status::StatusReporter;
use crate::MonitorError;

const IDENTITY_CATEGORY: &str = "BLS key";
const EXPLORER_NODES_PATH: &str = "nodes";
const SHORT_KEY_PREFIX_LEN: usize = 6;
const SHORT_KEY_SUFFIX_LEN: usize = 6;
const ELLIPSIS: &str = "...";

/// Runs the query-check-notify cycle for one monitored key set.
///
/// Every failure is counted by the status reporter before it is returned.
/// Flagged keys are recorded for the self-check even when the alert could
/// not be delivered.
pub struct KeysExecutor {
    name: String,
    explorer_url: String,
    statistics: Arc<dyn StatisticsQuerier>,
    keys_fetcher: Arc<dyn KeysFetcher>,
    checker: Arc<dyn RatingsCheck>,
    keys_filter: Arc<dyn KeysFilter>,
    status: Arc<dyn StatusReporter>,
    fanout: Arc<NotificationFanout>,
}

impl KeysExecutor {
    /// Create a new builder for configuring the executor.
    pub fn builder() -> KeysExecutorBuilder {
        KeysExecutorBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn find_problems(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProblemRecord>, MonitorError> {
        let ratings = self.statistics.query(cancel).await?;
        let extra_keys = self.keys_fetcher.get_all_bls_keys(cancel, &self.name).await?;
        self.checker.check(&ratings, &extra_keys)
    }

    fn create_message(&self, problem: &ProblemRecord) -> OutputMessage {
        OutputMessage::builder(Severity::Error)
            .category(IDENTITY_CATEGORY)
            .identity_key(&problem.identity_key)
            .short_identity_key(short_identity_key(&problem.identity_key))
            .identity_url(self.identity_url(&problem.identity_key))
            .source_name(&self.name)
            .detail(&problem.status_text)
            .build()
    }

    fn identity_url(&self, hex_key: &str) -> String {
        if self.explorer_url.is_empty() {
            return String::new();
        }
        match join_url(&self.explorer_url, &[EXPLORER_NODES_PATH, hex_key]) {
            Ok(url) => url,
            Err(reason) => {
                tracing::debug!(
                    executor = %self.name,
                    explorer_url = %self.explorer_url,
                    %reason,
                    "cannot build identity url"
                );
                String::new()
            }
        }
    }

    fn report(&self, err: MonitorError) -> MonitorError {
        tracing::debug!(executor = %self.name, error = %err, "cycle failed");
        self.status.error_encountered(&err);
        err
    }
}

#[async_trait]
impl CycleExecutor for KeysExecutor {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), MonitorError> {
        tracing::debug!(executor = %self.name, "executing query-check-notify cycle");

        let problems = self.find_problems(cancel).await.map_err(|e| self.report(e))?;

        let messages: Vec<OutputMessage> = problems
            .iter()
            .filter(|problem| self.keys_filter.should_notify(&problem.identity_key))
            .map(|problem| self.create_message(problem))
            .collect();
        if messages.is_empty() {
            tracing::debug!(executor = %self.name, "all keys are performing normally");
            return Ok(());
        }

        tracing::debug!(executor = %self.name, num_messages = messages.len(), "notifying");
        self.status.collect_keys_problems(&messages);
        self.fanout
            .notify_with_retry(&self.name, &messages)
            .await
            .map_err(|e| self.report(e))
    }
}

/// First and last characters of a key around an ellipsis. Keys too short to
/// benefit are returned whole.
pub fn short_identity_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= SHORT_KEY_PREFIX_LEN + ELLIPSIS.len() + SHORT_KEY_SUFFIX_LEN {
        return key.to_string();
    }

    let prefix: String = key.chars().take(SHORT_KEY_PREFIX_LEN).collect();
    let suffix: String = key.chars().skip(len - SHORT_KEY_SUFFIX_LEN).collect();
    format!("{prefix}{ELLIPSIS}{suffix}")
}

fn join_url(base: &str, segments: &[&str]) -> Result<String, String> {
    let mut url = Url::parse(base).map_err(|e| e.to_string())?;
    url.path_segments_mut()
        .map_err(|()| "url cannot be a base".to_string())?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

/// Builder for KeysExecutor.
#[derive(Default)]
pub struct KeysExecutorBuilder {
    name: Option<String>,
    explorer_url: Option<String>,
    statistics: Option<Arc<dyn StatisticsQuerier>>,
    keys_fetcher: Option<Arc<dyn KeysFetcher>>,
    checker: Option<Arc<dyn RatingsCheck>>,
    keys_filter: Option<Arc<dyn KeysFilter>>,
    status: Option<Arc<dyn StatusReporter>>,
    fanout: Option<Arc<NotificationFanout>>,
}

impl KeysExecutorBuilder {
    /// Name used as the source of every message.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Explorer base URL. Messages carry no link when unset.
    pub fn explorer_url(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = Some(url.into());
        self
    }

    pub fn statistics_querier(mut self, querier: Arc<dyn StatisticsQuerier>) -> Self {
        self.statistics = Some(querier);
        self
    }

    pub fn keys_fetcher(mut self, fetcher: Arc<dyn KeysFetcher>) -> Self {
        self.keys_fetcher = Some(fetcher);
        self
    }

    pub fn ratings_checker(mut self, checker: Arc<dyn RatingsCheck>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn keys_filter(mut self, filter: Arc<dyn KeysFilter>) -> Self {
        self.keys_filter = Some(filter);
        self
    }

    pub fn status_reporter(mut self, status: Arc<dyn StatusReporter>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn fanout(mut self, fanout: Arc<NotificationFanout>) -> Self {
        self.fanout = Some(fanout);
        self
    }

    pub fn build(self) -> Result<KeysExecutor, MonitorError> {
        Ok(KeysExecutor {
            name: self.name.unwrap_or_default(),
            explorer_url: self.explorer_url.unwrap_or_default(),
            statistics: self
                .statistics
                .ok_or(MonitorError::MissingComponent("statistics querier"))?,
            keys_fetcher: self
                .keys_fetcher
                .ok_or(MonitorError::MissingComponent("keys fetcher"))?,
            checker: self
                .checker
                .ok_or(MonitorError::MissingComponent("ratings checker"))?,
            keys_filter: self
                .keys_filter
                .ok_or(MonitorError::MissingComponent("keys filter"))?,
            status: self
                .status
                .ok_or(MonitorError::MissingComponent("status reporter"))?,
            fanout: self
                .fanout
                .ok_or(MonitorError::MissingComponent("notification fanout"))?,
        })
    }
}
