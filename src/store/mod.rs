// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state storage.
//!
//! The server only talks to storage through the [`DeviceStore`] trait. Two
//! backends are provided:
//!
//! - [`FileStore`] - one JSON record file per device, the format watched by
//!   the file change event source
//! - [`MemoryStore`] - in-process records, for tests and embedding
//!
//! Both share the same batch semantics: every attribute/value pair of a
//! `set` is validated before anything is written, so a request either
//! applies completely or not at all.
//!
//! # Record format
//!
//! ```text
//! {
//!   "ch1": { "state": "OFF", "possible_states": "ON, OFF" },
//!   "ch2": { "state": "OFF", "possible_states": "ON, OFF" }
//! }
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::DeviceStates;

/// Separator between allowed values in `possible_states`.
const POSSIBLE_STATES_SEPARATOR: char = ',';

/// Persisted form of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// The current value.
    pub state: String,
    /// Comma separated list of allowed values.
    pub possible_states: String,
}

impl AttributeRecord {
    /// Creates a record from a current value and its allowed values.
    #[must_use]
    pub fn new(state: impl Into<String>, allowed: &[&str]) -> Self {
        Self {
            state: state.into(),
            possible_states: allowed.join(", "),
        }
    }

    /// Returns the allowed values, in declaration order.
    #[must_use]
    pub fn allowed_values(&self) -> Vec<String> {
        self.possible_states
            .split(POSSIBLE_STATES_SEPARATOR)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Returns `true` if `value` is one of the allowed values.
    #[must_use]
    pub fn allows(&self, value: &str) -> bool {
        self.possible_states
            .split(POSSIBLE_STATES_SEPARATOR)
            .any(|allowed| allowed.trim() == value)
    }
}

/// Persisted form of a device: attribute name to record.
pub type DeviceRecord = BTreeMap<String, AttributeRecord>;

/// Result of a successful [`DeviceStore::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// The values were written; carries the full post-write state.
    Applied(DeviceStates),
    /// Every requested value already matched the current state.
    Unchanged,
}

/// Key-value access to device attributes.
///
/// Implementations must validate a whole `set` batch before writing any of
/// it.
pub trait DeviceStore {
    /// Returns the names of all configured devices.
    fn device_names(&self) -> Vec<String>;

    /// Returns the current value of every attribute of `device`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDevice`] or a store error if the backing
    /// resource cannot be read.
    fn states(&self, device: &str) -> Result<DeviceStates>;

    /// Returns the current value of one attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDevice`], [`Error::UnknownAttribute`] or a
    /// store error.
    fn state(&self, device: &str, attribute: &str) -> Result<String> {
        let mut states = self.states(device)?;
        states.remove(attribute).ok_or_else(|| Error::UnknownAttribute {
            device: device.to_string(),
            attribute: attribute.to_string(),
            known: states.into_keys().collect(),
        })
    }

    /// Validates and applies `targets` to `device` as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDevice`], [`Error::UnknownAttribute`],
    /// [`Error::InvalidValue`] or a store error. Nothing is written when an
    /// error is returned.
    fn set(&mut self, device: &str, targets: &[(String, String)]) -> Result<SetOutcome>;
}

/// Validates every target against `record`, then applies them.
///
/// Returns `true` if at least one value differs from the current state.
/// `record` is left untouched when validation fails.
pub(crate) fn apply_targets(
    device: &str,
    record: &mut DeviceRecord,
    targets: &[(String, String)],
) -> Result<bool> {
    for (attribute, value) in targets {
        let Some(current) = record.get(attribute) else {
            return Err(Error::UnknownAttribute {
                device: device.to_string(),
                attribute: attribute.clone(),
                known: record.keys().cloned().collect(),
            });
        };
        if !current.allows(value) {
            return Err(Error::InvalidValue {
                device: device.to_string(),
                attribute: attribute.clone(),
                value: value.clone(),
                allowed: current.allowed_values(),
            });
        }
    }

    let before = record_states(record);
    for (attribute, value) in targets {
        if let Some(current) = record.get_mut(attribute) {
            current.state.clone_from(value);
        }
    }
    Ok(record_states(record) != before)
}

/// Projects a record down to its current values.
pub(crate) fn record_states(record: &DeviceRecord) -> DeviceStates {
    record
        .iter()
        .map(|(attribute, rec)| (attribute.clone(), rec.state.clone()))
        .collect()
}
