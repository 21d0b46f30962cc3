//! # keywatch-types
//!
//! Core types shared by the keywatch crates. This crate defines the data that
//! flows through one monitoring cycle: the ratings reported upstream for each
//! validator key, the problems detected on them, and the alert envelope handed
//! to every notification channel.
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON serialization via serde (used to decode API responses)
//!
//! ## Example
//!
//! ```rust
//! use keywatch_types::{OutputMessage, Severity};
//!
//! let message = OutputMessage::builder(Severity::Error)
//!     .category("BLS key")
//!     .identity_key("0026a4b6d8f4")
//!     .source_name("mainnet")
//!     .detail("Imminent jail: temp rating: 0.00, rating: 0.00")
//!     .build();
//!
//! assert_eq!(message.severity.to_string(), "error");
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod identity;
mod message;
mod rating;

pub use identity::*;
pub use message::*;
pub use rating::*;
