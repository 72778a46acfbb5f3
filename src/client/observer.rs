//! Application-facing observer callbacks.

use serde_json::Value;

use crate::error::FayeError;

/// Observer for session lifecycle and message delivery.
///
/// Every method defaults to a no-op; implement only what you need. All
/// failures the client encounters asynchronously arrive here — the public
/// API itself never surfaces them as errors.
///
/// Callbacks run on the client's reader task: keep them short and hand
/// real work to your own executor.
#[allow(unused_variables)]
pub trait FayeObserver: Send + Sync {
    /// Handshake succeeded; the session is established.
    fn connected(&self) {}

    /// The session ended, either confirmed by the server or because the
    /// transport dropped.
    fn disconnected(&self) {}

    /// The transport could not connect, or the server rejected the
    /// handshake.
    fn connection_failed(&self) {}

    /// The server confirmed a subscription.
    fn subscribed(&self, channel: &str) {}

    /// A channel left the open set.
    fn unsubscribed(&self, channel: &str) {}

    /// The server rejected a subscription.
    fn subscription_failed(&self, channel: &str, error: &str) {}

    /// A message arrived on an open channel with no per-channel callback
    /// registered.
    fn message_received(&self, channel: &str, data: &Value) {}

    /// A pong frame arrived.
    fn pong_received(&self) {}

    /// A frame could not be written to the transport.
    fn write_error(&self, error: &FayeError) {}
}

/// The default observer: ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FayeObserver for NoopObserver {}
