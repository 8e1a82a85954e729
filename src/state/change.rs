// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute value transitions.

use std::fmt;

use crate::protocol::Response;

/// A single attribute moving from one value to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    /// The attribute that changed.
    pub attribute: String,
    /// The previously cached value.
    pub old: String,
    /// The newly observed value.
    pub new: String,
}

impl AttributeChange {
    /// Creates a change record.
    #[must_use]
    pub fn new(
        attribute: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            old: old.into(),
            new: new.into(),
        }
    }

    /// Builds the notification sent to subscribers of this attribute.
    #[must_use]
    pub fn to_notification(&self, device: &str) -> Response {
        Response::notification(device, &self.attribute, &self.old, &self.new)
    }
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}' -> '{}'", self.attribute, self.old, self.new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let change = AttributeChange::new("ch1", "OFF", "ON");
        assert_eq!(change.to_string(), "ch1: 'OFF' -> 'ON'");
    }

    #[test]
    fn notification_names_device() {
        let response = AttributeChange::new("ch1", "OFF", "ON").to_notification("relay");
        assert_eq!(response.message.as_states().unwrap()["device"], "relay");
    }
}
