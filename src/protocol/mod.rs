// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol types.
//!
//! Requests are whitespace separated UTF-8 text, parsed into a [`Command`].
//! Responses and notifications share one JSON record with exactly two
//! fields:
//!
//! ```text
//! {"success": true, "message": "Unsubscribed from all events of all devices."}
//! {"success": true, "message": {"ch1": "ON", "ch2": "OFF"}}
//! ```
//!
//! Decoding is strict: unknown fields, missing fields and any message that
//! is neither a string nor a flat string map are rejected.
//!
//! # Examples
//!
//! ```
//! use devnotify::protocol::{Command, Response};
//!
//! let command: Command = "get relay ch1".parse().unwrap();
//! assert_eq!(command.to_string(), "get relay ch1");
//!
//! let bytes = Response::text(true, "ON").encode();
//! let decoded = Response::decode(&bytes).unwrap();
//! assert!(decoded.success);
//! ```

mod command;

pub use command::Command;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Attribute name to value mapping, ordered by attribute name.
pub type DeviceStates = BTreeMap<String, String>;

/// Payload of a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Human readable text.
    Text(String),
    /// Attribute to value mapping.
    States(DeviceStates),
}

impl Message {
    /// Returns the text payload, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::States(_) => None,
        }
    }

    /// Returns the mapping payload, if this is a mapping message.
    #[must_use]
    pub fn as_states(&self) -> Option<&DeviceStates> {
        match self {
            Self::Text(_) => None,
            Self::States(states) => Some(states),
        }
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<DeviceStates> for Message {
    fn from(states: DeviceStates) -> Self {
        Self::States(states)
    }
}

/// A reply to a request, or an unsolicited change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Response {
    /// Whether the request succeeded.
    pub success: bool,
    /// Human readable text or an attribute mapping.
    pub message: Message,
}

impl Response {
    /// Creates a response with a text message.
    #[must_use]
    pub fn text(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: Message::Text(message.into()),
        }
    }

    /// Creates a successful response carrying an attribute mapping.
    #[must_use]
    pub fn states(states: DeviceStates) -> Self {
        Self {
            success: true,
            message: Message::States(states),
        }
    }

    /// Creates a failure response with a text message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::text(false, message)
    }

    /// Creates the notification sent to subscribers of a changed attribute.
    #[must_use]
    pub fn notification(device: &str, attribute: &str, old: &str, new: &str) -> Self {
        let states = DeviceStates::from([
            ("device".to_string(), device.to_string()),
            ("attribute".to_string(), attribute.to_string()),
            ("old".to_string(), old.to_string()),
            ("new".to_string(), new.to_string()),
        ]);
        Self::states(states)
    }

    /// Serializes the response to its JSON wire form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        // A bool and string maps always serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Parses a response from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the bytes are not exactly a two-field
    /// response record.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_response_wire_form() {
        let response = Response::text(false, "No device 'lamp' found!");
        let json = String::from_utf8(response.encode()).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"No device 'lamp' found!"}"#);
    }

    #[test]
    fn states_response_wire_form() {
        let states = DeviceStates::from([
            ("ch1".to_string(), "ON".to_string()),
            ("ch2".to_string(), "OFF".to_string()),
        ]);
        let json = String::from_utf8(Response::states(states).encode()).unwrap();
        assert_eq!(json, r#"{"success":true,"message":{"ch1":"ON","ch2":"OFF"}}"#);
    }

    #[test]
    fn decode_accepts_both_message_shapes() {
        let text = Response::decode(br#"{"success": true, "message": "ok"}"#).unwrap();
        assert_eq!(text.message.as_text(), Some("ok"));

        let map = Response::decode(br#"{"message": {"ch1": "ON"}, "success": true}"#).unwrap();
        assert_eq!(map.message.as_states().unwrap()["ch1"], "ON");
    }

    #[test]
    fn decode_rejects_unknown_fields() {
        let result = Response::decode(br#"{"success": true, "message": "ok", "extra": 1}"#);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn decode_rejects_missing_fields() {
        assert!(Response::decode(br#"{"success": true}"#).is_err());
        assert!(Response::decode(br#"{"message": "ok"}"#).is_err());
    }

    #[test]
    fn decode_rejects_wrong_types() {
        assert!(Response::decode(br#"{"success": "yes", "message": "ok"}"#).is_err());
        assert!(Response::decode(br#"{"success": true, "message": 5}"#).is_err());
        assert!(Response::decode(br#"{"success": true, "message": {"a": {"b": "c"}}}"#).is_err());
    }

    #[test]
    fn decode_rejects_literal_syntax() {
        assert!(Response::decode(b"{'Success': True, 'Message': 'ok'}").is_err());
        assert!(Response::decode(b"__import__('os')").is_err());
    }

    #[test]
    fn notification_carries_transition() {
        let response = Response::notification("relay", "ch1", "OFF", "ON");
        assert!(response.success);
        let states = response.message.as_states().unwrap();
        assert_eq!(states["device"], "relay");
        assert_eq!(states["attribute"], "ch1");
        assert_eq!(states["old"], "OFF");
        assert_eq!(states["new"], "ON");
    }
}
