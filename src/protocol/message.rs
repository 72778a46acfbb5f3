//! Bayeux wire messages.
//!
//! Defines the envelope exchanged with the server and constructors for
//! every request this client sends. Per Bayeux convention a message always
//! travels as a one-element JSON array; the wrapping and unwrapping live in
//! [`crate::codec`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::channel::{ConnectionType, MetaChannel};
use super::{BAYEUX_MINIMUM_VERSION, BAYEUX_VERSION};

/// Connection advice carried in `/meta/connect` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    /// Requested server timeout in milliseconds
    pub timeout: u64,
}

/// Bayeux message envelope.
///
/// Every field except `channel` is optional on the wire; absent fields are
/// omitted from the serialized form, never emitted as `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BayeuxMessage {
    /// Meta channel or application data channel
    pub channel: String,

    /// Protocol version (handshake)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Minimum acceptable protocol version (handshake)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,

    /// Connection types this client can use (handshake)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,

    /// Server-assigned session identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Connection type in use (connect, disconnect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,

    /// Timeout advice (connect)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Advice>,

    /// Target channel (subscribe, unsubscribe and their responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,

    /// Application payload (publish, delivery)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Request correlation id (publish)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Server-reported outcome on meta responses. Accepts both JSON bool
    /// and the 0/1 numbers older Faye servers emit.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_successful"
    )]
    pub successful: Option<bool>,

    /// Server error description, present on failed meta responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BayeuxMessage {
    /// Create a `/meta/handshake` request advertising all supported
    /// connection types.
    pub fn handshake() -> Self {
        Self {
            channel: MetaChannel::Handshake.as_str().to_string(),
            version: Some(BAYEUX_VERSION.to_string()),
            minimum_version: Some(BAYEUX_MINIMUM_VERSION.to_string()),
            supported_connection_types: Some(ConnectionType::supported()),
            ..Self::default()
        }
    }

    /// Create a `/meta/connect` keep-alive request.
    pub fn connect(client_id: &str, timeout_advice_ms: u64) -> Self {
        Self {
            channel: MetaChannel::Connect.as_str().to_string(),
            client_id: Some(client_id.to_string()),
            connection_type: Some(ConnectionType::WebSocket.as_str().to_string()),
            advice: Some(Advice {
                timeout: timeout_advice_ms,
            }),
            ..Self::default()
        }
    }

    /// Create a `/meta/disconnect` request.
    pub fn disconnect(client_id: &str) -> Self {
        Self {
            channel: MetaChannel::Disconnect.as_str().to_string(),
            client_id: Some(client_id.to_string()),
            connection_type: Some(ConnectionType::WebSocket.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Create a `/meta/unsubscribe` request for the given channel.
    pub fn unsubscribe(client_id: &str, channel: &str) -> Self {
        Self {
            channel: MetaChannel::Unsubscribe.as_str().to_string(),
            client_id: Some(client_id.to_string()),
            subscription: Some(channel.to_string()),
            ..Self::default()
        }
    }

    /// Create a publish request on an application channel.
    pub fn publish(channel: &str, client_id: &str, id: &str, data: Value) -> Self {
        Self {
            channel: channel.to_string(),
            client_id: Some(client_id.to_string()),
            id: Some(id.to_string()),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Classify this message's channel. `None` means an application data
    /// channel.
    pub fn meta_channel(&self) -> Option<MetaChannel> {
        MetaChannel::from_channel(&self.channel)
    }

    /// Whether the server reported success. Absent means failure.
    pub fn is_successful(&self) -> bool {
        self.successful.unwrap_or(false)
    }
}

/// Accept `true`/`false`, `1`/`0`, or null for the `successful` field.
fn deserialize_successful<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_i64() == Some(1))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid successful value: {other}"
        ))),
    }
}
