//! # Faye Core - Bayeux Publish/Subscribe Client
//!
//! Client-side implementation of the Bayeux protocol (the protocol behind
//! the Faye messaging server) over a persistent WebSocket connection, with
//! transparent handshake negotiation, a chained connect loop, and
//! subscription-state recovery.
//!
//! ## Architecture
//!
//! ```text
//! application ──> FayeClient ──> Session ──> codec ──> transport ──> network
//!                      │            │
//!                      └─────> SubscriptionRegistry <──┘
//! ```
//!
//! The session is a pure state machine: transport events and server
//! responses go in, [`Action`]s (frames to send, notifications to raise,
//! payloads to deliver) come out. The client facade executes those
//! actions on two ordered queues — one writer task, one reader task — so
//! writes keep their issue order and responses are applied in arrival
//! order.
//!
//! ## Subscription Lifecycle
//!
//! Every channel the application asks for is in exactly one of three
//! states:
//!
//! | State     | Meaning                                            |
//! |-----------|----------------------------------------------------|
//! | `queued`  | Requested while disconnected; flushed on handshake |
//! | `pending` | Request sent, awaiting confirmation                |
//! | `open`    | Confirmed; messages on the channel are delivered   |
//!
//! A transport drop tears all three down through the standard
//! unsubscribed notification — no subscription silently outlives the
//! connection. Subscriptions stuck in `pending` (a lost response, not a
//! lost connection) are re-sent by a recurring retry timer.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use faye::{FayeClient, FayeObserver};
//!
//! struct Printer;
//!
//! impl FayeObserver for Printer {
//!     fn message_received(&self, channel: &str, data: &serde_json::Value) {
//!         println!("{channel}: {data}");
//!     }
//! }
//!
//! let client = FayeClient::builder("ws://localhost:5222/faye")
//!     .observer(Arc::new(Printer))
//!     .build();
//!
//! client.connect();
//! client.subscribe("/cool");
//! client.publish("/cool", serde_json::json!({"text": "hi"}));
//! ```
//!
//! Per-channel callbacks take precedence over the observer:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! client.subscribe_with("/cool", Arc::new(|data| {
//!     println!("exclusive: {data}");
//! }));
//! ```
//!
//! ## Modules
//!
//! - [`client`]: public facade, observer trait, retry scheduler
//! - [`protocol`]: wire messages, subscription model, session state machine
//! - [`registry`]: queued/pending/open bookkeeping
//! - [`codec`]: one-element-array JSON wire codec
//! - [`transport`]: transport abstraction + WebSocket implementation
//! - [`config`]: file/env configuration
//! - [`error`]: error types and result alias

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod transport;

// Re-exports for convenience
pub use client::{FayeClient, FayeClientBuilder, FayeObserver, NoopObserver, PingCompletion};
pub use config::ClientConfig;
pub use error::{FayeError, Result};
pub use protocol::{
    Action, Advice, BayeuxMessage, ConnectionType, Connectivity, MetaChannel, Session,
    SessionEvent, Subscription, SubscriptionState,
};
pub use registry::{ChannelCallback, SubscriptionRegistry};
pub use transport::{Transport, TransportEvent, TransportHandle, WebSocketTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Bayeux protocol version spoken by this client
pub const BAYEUX_VERSION: &str = protocol::BAYEUX_VERSION;
