// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device store.

use std::collections::BTreeMap;

use super::{AttributeRecord, DeviceRecord, DeviceStore, SetOutcome, apply_targets, record_states};
use crate::error::{Error, Result};
use crate::protocol::DeviceStates;

/// Device store holding records in memory.
///
/// # Examples
///
/// ```
/// use devnotify::store::{DeviceStore, MemoryStore};
///
/// let store = MemoryStore::new()
///     .with_attribute("relay", "ch1", "OFF", &["ON", "OFF"])
///     .with_attribute("relay", "ch2", "OFF", &["ON", "OFF"]);
///
/// assert_eq!(store.state("relay", "ch1").unwrap(), "OFF");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    devices: BTreeMap<String, DeviceRecord>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a device record.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>, record: DeviceRecord) -> Self {
        self.devices.insert(device.into(), record);
        self
    }

    /// Adds an attribute, creating the device if needed.
    #[must_use]
    pub fn with_attribute(
        mut self,
        device: impl Into<String>,
        attribute: impl Into<String>,
        state: impl Into<String>,
        allowed: &[&str],
    ) -> Self {
        self.devices
            .entry(device.into())
            .or_default()
            .insert(attribute.into(), AttributeRecord::new(state, allowed));
        self
    }

    /// Overwrites an attribute value without validation.
    ///
    /// Stands in for another process writing the backing resource.
    pub fn overwrite(&mut self, device: &str, attribute: &str, state: impl Into<String>) {
        if let Some(record) = self
            .devices
            .get_mut(device)
            .and_then(|record| record.get_mut(attribute))
        {
            record.state = state.into();
        }
    }

    fn record(&self, device: &str) -> Result<&DeviceRecord> {
        self.devices
            .get(device)
            .ok_or_else(|| Error::UnknownDevice(device.to_string()))
    }
}

impl DeviceStore for MemoryStore {
    fn device_names(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    fn states(&self, device: &str) -> Result<DeviceStates> {
        self.record(device).map(record_states)
    }

    fn set(&mut self, device: &str, targets: &[(String, String)]) -> Result<SetOutcome> {
        let record = self
            .devices
            .get_mut(device)
            .ok_or_else(|| Error::UnknownDevice(device.to_string()))?;
        if apply_targets(device, record, targets)? {
            Ok(SetOutcome::Applied(record_states(record)))
        } else {
            Ok(SetOutcome::Unchanged)
        }
    }
}
