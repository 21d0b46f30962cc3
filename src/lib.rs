//! # keywatch
//!
//! Monitors the ratings of validator BLS keys and raises alerts when a key
//! is about to be jailed or when its rating drops.
//!
//! Every monitored network gets its own poller. Each cycle queries the
//! validator statistics, discovers the keys staked by the configured owner
//! addresses, checks every key against the rating rules, drops the alerts
//! that are snoozed and hands the rest to every configured notification
//! channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Poller                               │
//! │  ┌──────────────────────────────────────────────────────────┐    │
//! │  │                      KeysExecutor                        │    │
//! │  │  querier ──▶ fetcher ──▶ checker ──▶ snooze ──▶ fanout ──┼──▶ notifiers
//! │  │      │           │          │                     │      │    │
//! │  │      └───────────┴──────────┴──────▶ status ◀─────┘      │    │
//! │  └──────────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//!              Poller ──▶ CalendarTrigger ──▶ StatusHandler
//! ```
//!
//! - **[`checker`]**: Rating rules ([`RatingsChecker`])
//! - **[`snooze`]**: Per-key alert rate limiting ([`FaultySnoozeCache`])
//! - **[`fanout`]**: Delivery to every channel with retries ([`NotificationFanout`])
//! - **[`executor`]**: One query-check-notify cycle ([`KeysExecutor`])
//! - **[`status`]**: Error and flagged-key counters reported by the self-check
//! - **[`trigger`]**: Fires the self-check at a configured day and time
//! - **[`poller`]**: Runs any [`CycleExecutor`] at a fixed interval
//! - **[`config`]** / **[`factory`]**: Configuration files and assembly
//! - **[`logging`]**: stdout and rolling file logs
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! keywatch --config ./config/config.toml --credentials ./config/credentials.toml
//!
//! # Keep the logs in ./logs as well
//! keywatch --log-save
//!
//! # Send one message through every configured notifier and exit
//! keywatch --test-notifiers
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::path::Path;
//! use keywatch::config::AllConfigs;
//! use keywatch::factory;
//!
//! # tokio_test::block_on(async {
//! let configs = AllConfigs::load(
//!     Path::new("config/config.toml"),
//!     Path::new("config/credentials.toml"),
//! )?;
//! let monitoring = factory::start_monitoring(&configs)?;
//! monitoring.status.notify_app_start().await;
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod fanout;
pub mod logging;
pub mod poller;
pub mod snooze;
pub mod status;
pub mod trigger;

// Re-export main types for convenience
pub use checker::{RatingsCheck, RatingsChecker};
pub use error::MonitorError;
pub use executor::KeysExecutor;
pub use fanout::NotificationFanout;
pub use poller::{Closer, CycleExecutor, DisabledCloser, Poller};
pub use snooze::{DisabledKeysFilter, FaultySnoozeCache, KeysFilter};
pub use status::{DisabledStatusHandler, StatusHandler, StatusReporter};
pub use trigger::{CalendarTrigger, TriggerDay};
