// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Current-state cache.

use std::collections::BTreeMap;

use super::AttributeChange;
use crate::protocol::DeviceStates;

/// Cache of the last observed value of every attribute.
///
/// This is the only source of "previous value" when computing
/// notifications; it is never refreshed from storage except through
/// [`apply`](Self::apply). Keys are fixed once the cache is built.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    devices: BTreeMap<String, DeviceStates>,
}

impl StateCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the cache with the initial state of a device.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>, states: DeviceStates) -> Self {
        self.devices.insert(device.into(), states);
        self
    }

    /// Returns the cached state of a device.
    #[must_use]
    pub fn get(&self, device: &str) -> Option<&DeviceStates> {
        self.devices.get(device)
    }

    /// Returns the cached value of one attribute.
    #[must_use]
    pub fn value(&self, device: &str, attribute: &str) -> Option<&str> {
        self.devices
            .get(device)
            .and_then(|states| states.get(attribute))
            .map(String::as_str)
    }

    /// Compares `fresh` against the cached state of `device`.
    ///
    /// Only cached attributes are compared; attributes missing from either
    /// side produce no change. Unknown devices produce no changes.
    #[must_use]
    pub fn diff(&self, device: &str, fresh: &DeviceStates) -> Vec<AttributeChange> {
        let Some(cached) = self.devices.get(device) else {
            return Vec::new();
        };
        cached
            .iter()
            .filter_map(|(attribute, old)| {
                let new = fresh.get(attribute)?;
                (new != old).then(|| AttributeChange::new(attribute, old, new))
            })
            .collect()
    }

    /// Records the new value of a changed attribute.
    ///
    /// Returns `true` if the attribute is cached and was updated.
    pub fn apply(&mut self, device: &str, change: &AttributeChange) -> bool {
        match self
            .devices
            .get_mut(device)
            .and_then(|states| states.get_mut(&change.attribute))
        {
            Some(value) => {
                value.clone_from(&change.new);
                true
            }
            None => false,
        }
    }
}
