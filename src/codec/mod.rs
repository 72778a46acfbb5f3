//! Bayeux wire codec.
//!
//! Bayeux messages travel as JSON arrays of exactly one object. The codec
//! wraps outgoing messages and unwraps the first element of incoming
//! arrays; a bare object is tolerated on input since some servers send one.
//!
//! Decode failures are local to the offending frame: the reader logs them
//! and drops the frame, other in-flight state is untouched.

use serde_json::Value;

use crate::error::{FayeError, Result};
use crate::protocol::BayeuxMessage;

/// Serialize a message as a one-element JSON array.
pub fn encode(message: &BayeuxMessage) -> Result<String> {
    Ok(serde_json::to_string(&[message])?)
}

/// Parse incoming wire text into a message.
///
/// Accepts either a single JSON object or an array, in which case the
/// first element is taken.
pub fn decode(text: &str) -> Result<BayeuxMessage> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| FayeError::Parse(format!("not valid JSON: {e}")))?;
    from_value(value)
}

/// Parse an incoming binary frame. Faye servers speak UTF-8 JSON on binary
/// frames as well.
pub fn decode_slice(data: &[u8]) -> Result<BayeuxMessage> {
    let value: Value = serde_json::from_slice(data)
        .map_err(|e| FayeError::Parse(format!("not valid JSON: {e}")))?;
    from_value(value)
}

fn from_value(value: Value) -> Result<BayeuxMessage> {
    let object = match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                return Err(FayeError::Parse("empty message array".to_string()));
            }
            items.swap_remove(0)
        }
        object @ Value::Object(_) => object,
        other => {
            return Err(FayeError::Parse(format!(
                "expected object or array, got {other}"
            )))
        }
    };

    if !object.is_object() {
        return Err(FayeError::Parse("first array element is not an object".to_string()));
    }

    serde_json::from_value(object).map_err(|e| FayeError::Parse(format!("bad message shape: {e}")))
}
