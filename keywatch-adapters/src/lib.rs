//! # keywatch-adapters
//!
//! I/O adapters used by the keywatch monitor.
//!
//! This crate holds everything that talks to the outside world, each behind
//! a small trait so the monitoring core can be driven by stubs in tests:
//!
//! - **Statistics** ([`StatisticsQuerier`]) - validator ratings from the
//!   network API
//! - **Staked keys** ([`KeysFetcher`]) - resolves staking addresses into the
//!   BLS keys they currently have staked
//! - **Notifiers** ([`Notifier`]) - log, Pushover, SMTP e-mail, Slack
//!   and Telegram channels
//! - **Identity lists** - parser for the per-monitor list files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keywatch_adapters::http::HttpClient;
//! use keywatch_adapters::{StatisticsQuerier, ValidatorStatisticsQuerier};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpClient::builder()
//!         .base_url("https://api.multiversx.com")
//!         .build()?;
//!     let querier = ValidatorStatisticsQuerier::new(Arc::new(client));
//!
//!     let ratings = querier.query(&CancellationToken::new()).await?;
//!     println!("Fetched ratings for {} keys", ratings.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fetcher;
pub mod http;
pub mod list;
pub mod notifiers;
pub mod statistics;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::AdapterError;
pub use fetcher::{BlsKeysFetcher, KeysFetcher};
pub use list::parse_list_file;
pub use notifiers::{
    LettreMailer, LogNotifier, MailSender, Notifier, PushoverNotifier, SlackNotifier,
    SmtpNotifier, TelegramNotifier,
};
pub use statistics::{StatisticsQuerier, ValidatorStatisticsQuerier};

// Re-export types for convenience
pub use keywatch_types::{IdentityList, OutputMessage, RatingRecord, RatingsMap, Severity};
