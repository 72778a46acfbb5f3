//! Bayeux channel names and connection types.

/// Meta channels defined by the Bayeux protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaChannel {
    /// `/meta/handshake` — session negotiation
    Handshake,
    /// `/meta/connect` — the long-lived keep-alive loop
    Connect,
    /// `/meta/disconnect` — session termination
    Disconnect,
    /// `/meta/subscribe` — channel subscription request
    Subscribe,
    /// `/meta/unsubscribe` — channel subscription removal
    Unsubscribe,
}

impl MetaChannel {
    /// Wire representation of the channel name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handshake => "/meta/handshake",
            Self::Connect => "/meta/connect",
            Self::Disconnect => "/meta/disconnect",
            Self::Subscribe => "/meta/subscribe",
            Self::Unsubscribe => "/meta/unsubscribe",
        }
    }

    /// Classify an incoming channel name. Returns `None` for application
    /// (data) channels.
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "/meta/handshake" => Some(Self::Handshake),
            "/meta/connect" => Some(Self::Connect),
            "/meta/disconnect" => Some(Self::Disconnect),
            "/meta/subscribe" => Some(Self::Subscribe),
            "/meta/unsubscribe" => Some(Self::Unsubscribe),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetaChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bayeux connection types advertised during handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// HTTP long-polling
    LongPolling,
    /// JSONP callback polling
    CallbackPolling,
    /// Iframe streaming
    Iframe,
    /// WebSocket (the type this client actually uses)
    WebSocket,
}

impl ConnectionType {
    /// Wire representation of the connection type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongPolling => "long-polling",
            Self::CallbackPolling => "callback-polling",
            Self::Iframe => "iframe",
            Self::WebSocket => "websocket",
        }
    }

    /// The full list advertised in `/meta/handshake`. The server may pick
    /// any of these per the protocol; this client connects over websocket.
    pub fn supported() -> Vec<String> {
        [
            Self::LongPolling,
            Self::CallbackPolling,
            Self::Iframe,
            Self::WebSocket,
        ]
        .iter()
        .map(|t| t.as_str().to_string())
        .collect()
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check that a channel name is structurally valid: non-empty and
/// slash-prefixed (`/foo`, `/foo/bar`, `/foo/**`).
pub fn is_valid_channel_name(channel: &str) -> bool {
    channel.len() > 1 && channel.starts_with('/')
}
