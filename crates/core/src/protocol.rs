// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for client-server communication.
//!
//! The protocol is simple:
//! - Client sends one subscribe frame per channel after the socket opens
//! - Server pushes envelopes carrying either a channel update or an error/status
//!
//! Payloads are opaque: a channel update is stored as the serialized `value`
//! object, untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name carried by subscribe frames.
pub const SUBSCRIBE_METHOD: &str = "subscribe";

/// Update kind that marks a sync-significant update.
pub const SYNC_KIND: &str = "sync";

/// Markers in an envelope's `error`/`message` field that mean the session is gone.
const SESSION_ERROR_MARKERS: &[&str] = &[
    "expired",
    "invalid",
    "unauthorized",
    "unauthorised",
    "not authorized",
];

/// Frame sent from client to server to join a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscribeFrame {
    /// Network/environment label.
    pub webfix: String,
    /// Always [`SUBSCRIBE_METHOD`].
    pub method: String,
    /// Channel name.
    pub channel: String,
}

impl SubscribeFrame {
    /// Creates a subscribe frame for a channel on the given network.
    pub fn subscribe(network: impl Into<String>, channel: impl Into<String>) -> Self {
        SubscribeFrame {
            webfix: network.into(),
            method: SUBSCRIBE_METHOD.to_string(),
            channel: channel.into(),
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Builds the fixed subscription handshake for a network.
pub fn subscription_frames(network: &str, channels: &[String]) -> Vec<SubscribeFrame> {
    channels
        .iter()
        .map(|channel| SubscribeFrame::subscribe(network, channel.as_str()))
        .collect()
}

/// Parsed inbound message.
///
/// `error` and `message` are kept as raw JSON because servers send either
/// strings or structured objects there.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Flags attached to a channel update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateFlags {
    /// The update's `type` field, if any.
    pub kind: Option<String>,
    /// The update's `important` field.
    pub important: bool,
}

impl UpdateFlags {
    /// True when the application-status holder should be told about this update.
    pub fn is_significant(&self) -> bool {
        self.important || self.kind.as_deref() == Some(SYNC_KIND)
    }
}

/// A keyed update destined for the mirrored store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpdate {
    pub channel: String,
    /// The serialized `value` object.
    pub payload: String,
    pub flags: UpdateFlags,
}

impl Envelope {
    /// Deserializes an envelope from JSON.
    ///
    /// Anything that is not a JSON object fails here and is dropped by callers.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let object: serde_json::Map<String, Value> = serde_json::from_str(s)?;
        serde_json::from_value(Value::Object(object))
    }

    /// Serializes the envelope to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Creates an envelope carrying a channel update.
    pub fn update(value: Value) -> Self {
        Envelope {
            value: Some(value),
            ..Default::default()
        }
    }

    /// Creates an envelope carrying an error.
    pub fn error(message: impl Into<String>) -> Self {
        Envelope {
            error: Some(Value::String(message.into())),
            ..Default::default()
        }
    }

    /// Returns the offending text if the envelope reports an invalid session.
    pub fn session_error(&self) -> Option<String> {
        [&self.error, &self.message]
            .into_iter()
            .flatten()
            .map(signal_text)
            .find(|text| {
                let lower = text.to_lowercase();
                SESSION_ERROR_MARKERS.iter().any(|m| lower.contains(m))
            })
    }

    /// Extracts the channel update, if the envelope carries one.
    pub fn channel_update(&self) -> Option<ChannelUpdate> {
        let value = self.value.as_ref()?;
        let object = value.as_object()?;
        let channel = object.get("channel")?.as_str()?;
        if channel.is_empty() {
            return None;
        }

        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        let important = object
            .get("important")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Some(ChannelUpdate {
            channel: channel.to_string(),
            payload: value.to_string(),
            flags: UpdateFlags { kind, important },
        })
    }
}

fn signal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
