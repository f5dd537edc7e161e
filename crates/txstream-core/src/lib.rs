//! txstream-core — data model and policies for the pending-transaction feed.
//!
//! # Overview
//!
//! The core crate has no async runtime dependency. It defines:
//!
//! - [`Transaction`] — the record delivered to consumers, with [`Transaction::validate`]
//! - [`Notification`] — the wire envelope a transaction arrives in
//! - [`DedupCache`] — time-bounded set of already forwarded hashes
//! - [`Backoff`] / [`BackoffConfig`] — reconnect delay policy
//! - [`StreamError`] / [`ConfigError`] / [`ValidationError`] — error taxonomy

pub mod backoff;
pub mod dedup;
pub mod error;
pub mod notification;
pub mod transaction;

pub use backoff::{Backoff, BackoffConfig};
pub use dedup::DedupCache;
pub use error::{ConfigError, StreamError, ValidationError};
pub use notification::{parse_transaction, Notification, SUBSCRIBE_REQUEST};
pub use transaction::Transaction;
