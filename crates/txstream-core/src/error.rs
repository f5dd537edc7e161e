//! Error types for the transaction feed.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid configuration. Raised before any network activity and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a client certificate nor an account/secret pair was supplied.
    #[error("no authentication set")]
    NoAuthentication,

    /// Endpoint override could not be used as a WebSocket URL.
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A certificate or key file could not be read.
    #[error("failed to read certificate file {}", .path.display())]
    Certificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TLS identity or connector could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(String),
}

/// A transaction is missing one of its required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Carries the wire name of the first missing field.
    #[error("{0} is unset")]
    MissingField(&'static str),
}

impl ValidationError {
    /// Wire name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField(name) => name,
        }
    }
}

/// Errors that can end a session or prevent the stream from starting.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dialing the endpoint failed.
    #[error("connect to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// Send/receive failure on an established connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote side closed the connection.
    #[error("connection closed by remote")]
    Closed,

    /// The subscribe response carried an error marker.
    #[error("subscription failed: {response}")]
    HandshakeRejected { response: String },

    /// An inbound message was not a well-formed notification.
    #[error("malformed notification: {0}")]
    Decode(#[from] serde_json::Error),

    /// A notification arrived without a nested transaction.
    #[error("unexpected message format: notification carries no transaction")]
    MissingRecord,

    #[error("tx validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl StreamError {
    /// Returns `true` for configuration errors (fatal, never retried).
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if the error was raised while establishing a session
    /// (dial or subscribe handshake) rather than while consuming one.
    pub fn is_connect_phase(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::HandshakeRejected { .. })
    }

    /// Returns `true` if the error came from an inbound message's content.
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::MissingRecord | Self::Validation(_)
        )
    }
}
