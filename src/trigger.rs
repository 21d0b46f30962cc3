//! Calendar-driven trigger for the weekly self-check.
//!
//! The trigger is polled far more often than once a minute. It fires its
//! executor on the first poll that falls in the target minute and stays
//! quiet for the rest of that minute.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Timelike, Weekday};
use tokio_util::sync::CancellationToken;

use crate::poller::CycleExecutor;
use crate::status::{local_now, LocalTimeFn};
use crate::MonitorError;

/// Day on which the trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDay {
    EveryDay,
    Day(Weekday),
}

impl TriggerDay {
    fn matches(self, weekday: Weekday) -> bool {
        match self {
            TriggerDay::EveryDay => true,
            TriggerDay::Day(day) => day == weekday,
        }
    }
}

impl FromStr for TriggerDay {
    type Err = MonitorError;

    /// Accepts `"every day"` or an English weekday name, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let day = match s.to_lowercase().as_str() {
            "every day" => return Ok(TriggerDay::EveryDay),
            "monday" => Weekday::Mon,
            "tuesday" => Weekday::Tue,
            "wednesday" => Weekday::Wed,
            "thursday" => Weekday::Thu,
            "friday" => Weekday::Fri,
            "saturday" => Weekday::Sat,
            "sunday" => Weekday::Sun,
            _ => return Err(MonitorError::InvalidWeekDay(s.to_string())),
        };
        Ok(TriggerDay::Day(day))
    }
}

impl fmt::Display for TriggerDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerDay::EveryDay => f.write_str("every day"),
            TriggerDay::Day(day) => write!(f, "{day:?}"),
        }
    }
}

/// Fires the wrapped executor once per matching (day, hour, minute).
pub struct CalendarTrigger {
    executor: Arc<dyn CycleExecutor>,
    day: TriggerDay,
    hour: u32,
    minute: u32,
    now: LocalTimeFn,
    armed: AtomicBool,
}

impl CalendarTrigger {
    /// Create a new builder for configuring the trigger.
    pub fn builder() -> CalendarTriggerBuilder {
        CalendarTriggerBuilder::default()
    }
}

#[async_trait]
impl CycleExecutor for CalendarTrigger {
    async fn execute(&self, cancel: &CancellationToken) -> Result<(), MonitorError> {
        let now = (self.now)();

        let matches = self.day.matches(now.weekday())
            && now.hour() == self.hour
            && now.minute() == self.minute;
        if !matches {
            self.armed.store(true, Ordering::SeqCst);
            return Ok(());
        }

        if self.armed.swap(false, Ordering::SeqCst) {
            tracing::debug!(day = %self.day, hour = self.hour, minute = self.minute, "trigger fired");
            return self.executor.execute(cancel).await;
        }

        Ok(())
    }
}

/// Builder for CalendarTrigger.
#[derive(Default)]
pub struct CalendarTriggerBuilder {
    executor: Option<Arc<dyn CycleExecutor>>,
    day: Option<TriggerDay>,
    hour: u32,
    minute: u32,
    now: Option<LocalTimeFn>,
}

impl CalendarTriggerBuilder {
    pub fn executor(mut self, executor: Arc<dyn CycleExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Day to fire on. Default: every day
    pub fn day(mut self, day: TriggerDay) -> Self {
        self.day = Some(day);
        self
    }

    pub fn hour(mut self, hour: u32) -> Self {
        self.hour = hour;
        self
    }

    pub fn minute(mut self, minute: u32) -> Self {
        self.minute = minute;
        self
    }

    /// Clock the trigger is evaluated against. Default: local wall clock
    pub fn clock(mut self, now: LocalTimeFn) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(self) -> Result<CalendarTrigger, MonitorError> {
        let executor = self
            .executor
            .ok_or(MonitorError::MissingComponent("executor"))?;
        if self.hour > 23 {
            return Err(MonitorError::InvalidHour(self.hour));
        }
        if self.minute > 59 {
            return Err(MonitorError::InvalidMinute(self.minute));
        }

        Ok(CalendarTrigger {
            executor,
            day: self.day.unwrap_or(TriggerDay::EveryDay),
            hour: self.hour,
            minute: self.minute,
            now: self.now.unwrap_or_else(|| Arc::new(local_now)),
            armed: AtomicBool::new(true),
        })
    }
}
