//! Message envelope (JSON object, one per text frame).
//!
//! Only `type` is required on the wire, and it must be a string. Fields this
//! crate does not know about are kept in `extra` and written back with the
//! same values, so newer servers can add fields without breaking older
//! clients. A `sender` or `timestamp` that is not a string also lands in
//! `extra` instead of rejecting the frame. An explicit `"content": null` is
//! kept as `Some(Null)` and written back. Key order is not preserved.

use chrono::{SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, Result};

static NULL: Value = Value::Null;

/// One discrete inbound/outbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Routing discriminator (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Opaque payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Optional sender id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// ISO-8601 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Any other named fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub fn new(msg_type: impl Into<String>, content: Value) -> Self {
        Self {
            msg_type: msg_type.into(),
            content: Some(content),
            sender: None,
            timestamp: None,
            extra: Map::new(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.extra.remove("sender");
        self.sender = Some(sender.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.extra.remove("timestamp");
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Attach an extra top-level field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Payload, or JSON `null` when the frame carried none.
    pub fn content(&self) -> &Value {
        self.content.as_ref().unwrap_or(&NULL)
    }

    /// Fill `timestamp` with the current UTC time unless one is already set.
    /// An empty string counts as unset.
    pub fn stamp_if_missing(&mut self) {
        let missing = self.timestamp.as_deref().map_or(true, str::is_empty);
        if missing {
            self.extra.remove("timestamp");
            self.timestamp = Some(now_iso8601());
        }
    }

    /// Check the invariants every outbound envelope must satisfy.
    pub fn validate_outbound(&self) -> Result<()> {
        if self.msg_type.trim().is_empty() {
            return Err(ClientError::InvalidEnvelope("type must not be empty".into()));
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;

        let msg_type = match fields.remove("type") {
            Some(Value::String(t)) => t,
            Some(other) => {
                return Err(de::Error::custom(format!("`type` must be a string, got {other}")))
            }
            None => return Err(de::Error::missing_field("type")),
        };
        let content = fields.remove("content");
        let sender = take_string(&mut fields, "sender");
        let timestamp = take_string(&mut fields, "timestamp");

        Ok(Self {
            msg_type,
            content,
            sender,
            timestamp,
            extra: fields,
        })
    }
}

/// Remove `key` if it holds a string; any other value stays where it is.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !matches!(fields.get(key), Some(Value::String(_))) {
        return None;
    }
    match fields.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Current UTC time, millisecond precision, `Z` suffix.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stamp_fills_missing_and_empty() {
        let mut env = Envelope::new("chat", json!("hi"));
        env.stamp_if_missing();
        let ts = env.timestamp.clone().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());

        let mut env = Envelope::new("chat", json!("hi")).with_timestamp("");
        env.stamp_if_missing();
        assert!(!env.timestamp.unwrap().is_empty());
    }

    #[test]
    fn stamp_keeps_existing() {
        let mut env = Envelope::new("chat", json!(1)).with_timestamp("2024-01-01T00:00:00.000Z");
        env.stamp_if_missing();
        assert_eq!(env.timestamp.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn blank_type_is_rejected() {
        let err = Envelope::new("  ", json!(null)).validate_outbound().unwrap_err();
        assert_eq!(err.kind().as_str(), "INVALID_ENVELOPE");
        assert!(Envelope::new("ping", json!(null)).validate_outbound().is_ok());
    }

    #[test]
    fn content_defaults_to_null_view() {
        let env: Envelope = serde_json::from_str(r#"{"type":"presence"}"#).unwrap();
        assert!(env.content.is_none());
        assert!(env.content().is_null());
    }

    #[test]
    fn explicit_null_content_is_written_back() {
        let env: Envelope = serde_json::from_str(r#"{"type":"x","content":null}"#).unwrap();
        assert_eq!(env.content, Some(Value::Null));
        assert_eq!(serde_json::to_string(&env).unwrap(), r#"{"type":"x","content":null}"#);
    }

    #[test]
    fn odd_sender_and_timestamp_are_kept_aside() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"chat","sender":42,"timestamp":null}"#).unwrap();
        assert_eq!(env.sender, None);
        assert_eq!(env.timestamp, None);
        assert_eq!(env.extra["sender"], json!(42));

        let v: Value = serde_json::to_value(&env).unwrap();
        assert_eq!(v, json!({ "type": "chat", "sender": 42, "timestamp": null }));
    }

    #[test]
    fn stamping_replaces_odd_timestamp() {
        let mut env: Envelope = serde_json::from_str(r#"{"type":"chat","timestamp":7}"#).unwrap();
        env.stamp_if_missing();
        assert!(!env.extra.contains_key("timestamp"));
        let v: Value = serde_json::to_value(&env).unwrap();
        assert!(v["timestamp"].is_string());
    }
}
