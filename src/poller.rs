//! Fixed-interval driver for monitoring cycles.
//!
//! A [`Poller`] runs its executor, waits, and runs it again until closed.
//! After a failed cycle it waits `error_interval` instead of `interval`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use keywatch::{Closer, CycleExecutor, Poller};
//!
//! # async fn run(executor: Arc<dyn CycleExecutor>) -> Result<(), keywatch::MonitorError> {
//! let poller = Poller::builder()
//!     .name("mainnet")
//!     .executor(executor)
//!     .interval(Duration::from_secs(60))
//!     .error_interval(Duration::from_secs(10))
//!     .build()?;
//!
//! poller.start_processing_loop()?;
//! tokio::time::sleep(Duration::from_secs(600)).await;
//! poller.close()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::MonitorError;

/// Smallest interval a poller accepts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// One unit of periodic work.
#[async_trait]
pub trait CycleExecutor: Send + Sync {
    /// Run one cycle. `cancel` fires when the owner is shutting down.
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), MonitorError>;
}

/// Something that can be shut down.
pub trait Closer: Send + Sync {
    fn close(&self) -> Result<(), MonitorError>;
}

/// Closer used where nothing has to be stopped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCloser;

impl Closer for DisabledCloser {
    fn close(&self) -> Result<(), MonitorError> {
        Ok(())
    }
}

/// Runs a [`CycleExecutor`] on a background task.
pub struct Poller {
    name: String,
    executor: Arc<dyn CycleExecutor>,
    interval: Duration,
    error_interval: Duration,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Create a new builder for configuring the poller.
    pub fn builder() -> PollerBuilder {
        PollerBuilder::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the processing loop. Fails if it was already started.
    pub fn start_processing_loop(&self) -> Result<(), MonitorError> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }

        let name = self.name.clone();
        let executor = self.executor.clone();
        let interval = self.interval;
        let error_interval = self.error_interval;
        let cancel = self.cancel.clone();

        *task = Some(tokio::spawn(async move {
            tracing::info!(monitor = %name, ?interval, "processing loop started");
            loop {
                let cycle = cancel.child_token();
                let wait = match executor.execute(&cycle).await {
                    Ok(()) => interval,
                    Err(err) => {
                        tracing::error!(monitor = %name, error = %err, "cycle failed");
                        error_interval
                    }
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
            tracing::info!(monitor = %name, "processing loop stopped");
        }));

        Ok(())
    }
}

impl Closer for Poller {
    fn close(&self) -> Result<(), MonitorError> {
        self.cancel.cancel();
        Ok(())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Builder for Poller.
#[derive(Default)]
pub struct PollerBuilder {
    name: Option<String>,
    executor: Option<Arc<dyn CycleExecutor>>,
    interval: Option<Duration>,
    error_interval: Option<Duration>,
}

impl PollerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn executor(mut self, executor: Arc<dyn CycleExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Wait after a successful cycle.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Wait after a failed cycle. Defaults to the regular interval.
    pub fn error_interval(mut self, error_interval: Duration) -> Self {
        self.error_interval = Some(error_interval);
        self
    }

    pub fn build(self) -> Result<Poller, MonitorError> {
        let executor = self
            .executor
            .ok_or(MonitorError::MissingComponent("executor"))?;
        let interval = self
            .interval
            .ok_or(MonitorError::MissingComponent("interval"))?;
        let error_interval = self.error_interval.unwrap_or(interval);

        for value in [interval, error_interval] {
            if value < MIN_POLL_INTERVAL {
                return Err(MonitorError::InvalidInterval(value, MIN_POLL_INTERVAL));
            }
        }

        Ok(Poller {
            name: self.name.unwrap_or_default(),
            executor,
            interval,
            error_interval,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        })
    }
}
