//! txstream-ws — self-healing WebSocket subscription to a pending-transaction feed.
//!
//! # Features
//! - Header-token or client-certificate authentication
//! - Auto-reconnect with exponential backoff and jitter
//! - Strict decoding and validation of every notification
//! - Time-bounded deduplication by transaction hash
//! - Bounded output channel (slow consumers apply backpressure)
//! - Explicit shutdown through a `CancellationToken`

pub mod config;
pub mod connector;
pub mod listener;
pub mod metrics;
pub mod stream;

pub use config::{Auth, ClientCertificate, StreamConfig, StreamConfigBuilder};
pub use connector::{FeedConnection, FeedConnector, WsConnector};
pub use listener::{LoggingListener, StreamListener};
pub use metrics::{MetricsSnapshot, StreamMetrics};
pub use stream::{TxFeed, TxStream};
