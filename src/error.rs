//! Faye client error types.
//!
//! Errors returned synchronously by this crate. Asynchronous outcomes
//! (handshake failures, dropped connections, rejected subscriptions) are
//! never surfaced as errors — they reach the application through the
//! [`FayeObserver`](crate::client::FayeObserver) callbacks instead.

use thiserror::Error;

/// Faye client errors.
#[derive(Error, Debug)]
pub enum FayeError {
    /// Incoming wire text was not a valid Bayeux message.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A message references no channel or a malformed channel name.
    ///
    /// This is the "structurally invalid" half of the serialization
    /// precondition; contrast with [`FayeError::MissingClientId`].
    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    /// A subscription cannot be serialized yet because no clientId has
    /// been assigned by the server. Callers defer (queue) rather than fail.
    #[error("No clientId for subscription to {0}")]
    MissingClientId(String),

    /// Transport-level failure (opening a connection).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A frame could not be handed to the transport.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Faye operations
pub type Result<T> = std::result::Result<T, FayeError>;

impl From<toml::de::Error> for FayeError {
    fn from(err: toml::de::Error) -> Self {
        FayeError::Config(err.to_string())
    }
}
