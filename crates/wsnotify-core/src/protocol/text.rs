//! Text frame codec: exactly one JSON object per frame.

use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::protocol::envelope::Envelope;

/// Decode one inbound text frame.
///
/// Fails with `Decode` when the frame is not JSON, not an object, or lacks a
/// string `type`. No defaults are invented for malformed input.
pub fn decode_frame(raw: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ClientError::Decode(format!("invalid json: {e}")))?;
    if !value.is_object() {
        return Err(ClientError::Decode("frame is not a json object".into()));
    }
    serde_json::from_value(value)
        .map_err(|e| ClientError::Decode(format!("invalid envelope: {e}")))
}

/// Encode one outbound envelope into a text frame.
pub fn encode_frame(env: &Envelope) -> Result<String> {
    serde_json::to_string(env)
        .map_err(|e| ClientError::InvalidEnvelope(format!("json encode failed: {e}")))
}
