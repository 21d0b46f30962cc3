//! Error types for the monitoring core.

use thiserror::Error;

use keywatch_adapters::AdapterError;

/// Errors raised while assembling or running the monitoring pipeline.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid alarm delta rating drop {0}, expected a value in [0, 100]")]
    InvalidAlarmDeltaRatingDrop(f64),

    #[error("invalid time between retries {0:?}, minimum is {1:?}")]
    InvalidTimeBetweenRetries(std::time::Duration, std::time::Duration),

    #[error("invalid week day {0:?}")]
    InvalidWeekDay(String),

    #[error("invalid hour {0}, expected a value in [0, 23]")]
    InvalidHour(u32),

    #[error("invalid minute {0}, expected a value in [0, 59]")]
    InvalidMinute(u32),

    #[error("invalid interval {0:?}, minimum is {1:?}")]
    InvalidInterval(std::time::Duration, std::time::Duration),

    /// A builder was asked to build without one of its collaborators.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    /// Some channels still failed after every retry.
    #[error("notification sending problems: num notifiers with problems: {0}")]
    NotificationsSendingProblems(usize),

    #[error("processing loop already started")]
    AlreadyStarted,

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}
