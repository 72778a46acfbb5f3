//! Transport layer abstraction.
//!
//! The session core is transport-agnostic: it consumes a stream of
//! [`TransportEvent`]s and pushes frames through a [`TransportHandle`].
//! The bundled implementation is [`WebSocketTransport`]; tests substitute
//! channel-backed mocks.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               FayeClient                │
//! │          (transport-agnostic)           │
//! └───────┬───────────────────▲─────────────┘
//!         │ TransportHandle   │ TransportEvent
//! ┌───────▼───────────────────┴─────────────┐
//! │           WebSocketTransport            │
//! │          (tokio-tungstenite)            │
//! └─────────────────────────────────────────┘
//! ```

mod websocket;

pub use websocket::WebSocketTransport;

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::error::{FayeError, Result};

/// Event reported by a transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is up and frames can flow
    Connected,
    /// The connection could not be established
    ConnectFailed(String),
    /// An established connection ended from the remote side or failed
    /// mid-stream, with an optional reason. Locally requested closes are
    /// not reported back.
    Disconnected(Option<String>),
    /// A frame could not be written
    WriteError(String),
    /// Incoming text frame
    Text(String),
    /// Incoming binary frame
    Binary(Vec<u8>),
    /// Incoming ping frame
    Ping(Vec<u8>),
    /// Incoming pong frame
    Pong(Vec<u8>),
}

/// Command accepted by a transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Write a text frame
    Text(String),
    /// Write a ping frame
    Ping(Vec<u8>),
    /// Close the connection
    Close,
}

/// Handle to a live transport connection.
///
/// Writes are commands on an ordered queue consumed by the connection
/// task; the handle never blocks.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<TransportCommand>,
}

impl TransportHandle {
    /// Wrap a command channel into a handle. Transport implementations
    /// call this from `open`.
    pub fn new(commands: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self { commands }
    }

    /// Queue a text frame for writing.
    pub fn write_text(&self, text: String) -> Result<()> {
        self.commands
            .send(TransportCommand::Text(text))
            .map_err(|_| FayeError::WriteFailed("connection closed".to_string()))
    }

    /// Queue a ping frame for writing.
    pub fn write_ping(&self, payload: Vec<u8>) -> Result<()> {
        self.commands
            .send(TransportCommand::Ping(payload))
            .map_err(|_| FayeError::WriteFailed("connection closed".to_string()))
    }

    /// Ask the connection to close. Safe to call on an already-closed
    /// connection.
    pub fn close(&self) {
        let _ = self.commands.send(TransportCommand::Close);
    }

    /// Whether the connection task is still accepting commands.
    pub fn is_open(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Transport trait for pluggable connection backends.
///
/// `open` must not block: implementations spawn their connection task and
/// report progress through `events`, starting with either
/// [`TransportEvent::Connected`] or [`TransportEvent::ConnectFailed`].
pub trait Transport: Send + Sync {
    /// Open a connection to `url`, delivering events until the connection
    /// ends. Returns the write handle.
    fn open(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<TransportHandle>;

    /// Transport name for logging.
    fn name(&self) -> &'static str;
}
