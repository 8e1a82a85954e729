// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device, per-attribute subscriber registry.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::error::{Error, Result};

/// Network endpoint of a subscriber.
pub type SubscriberAddress = SocketAddr;

/// Registry mapping device -> attribute -> ordered subscriber addresses.
///
/// An address appears at most once per (device, attribute) pair. Addresses
/// are kept in subscription order, which is also the notification order.
///
/// The registry is owned by the reactor loop and mutated only from it, so
/// it needs no interior locking.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    buckets: BTreeMap<String, BTreeMap<String, Vec<SubscriberAddress>>>,
}

impl SubscriptionRegistry {
    /// Creates a registry with no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device and its attributes as registry keys.
    ///
    /// Keys can only be added while building the registry.
    #[must_use]
    pub fn with_device<I, A>(mut self, device: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let bucket = self.buckets.entry(device.into()).or_default();
        for attribute in attributes {
            bucket.entry(attribute.into()).or_default();
        }
        self
    }

    /// Returns `true` if (device, attribute) is a configured key.
    #[must_use]
    pub fn has_attribute(&self, device: &str, attribute: &str) -> bool {
        self.buckets
            .get(device)
            .is_some_and(|attributes| attributes.contains_key(attribute))
    }

    fn bucket(&self, device: &str, attribute: &str) -> Result<&Vec<SubscriberAddress>> {
        let attributes = self
            .buckets
            .get(device)
            .ok_or_else(|| Error::UnknownDevice(device.to_string()))?;
        attributes
            .get(attribute)
            .ok_or_else(|| Error::UnknownAttribute {
                device: device.to_string(),
                attribute: attribute.to_string(),
                known: attributes.keys().cloned().collect(),
            })
    }

    fn check_subscribable(
        &self,
        address: SubscriberAddress,
        device: &str,
        attribute: &str,
    ) -> Result<()> {
        if self.bucket(device, attribute)?.contains(&address) {
            return Err(Error::AlreadySubscribed {
                device: device.to_string(),
                attribute: attribute.to_string(),
            });
        }
        Ok(())
    }

    fn push(&mut self, address: SubscriberAddress, device: &str, attribute: &str) {
        if let Some(bucket) = self
            .buckets
            .get_mut(device)
            .and_then(|attributes| attributes.get_mut(attribute))
        {
            bucket.push(address);
        }
    }

    /// Subscribes `address` to one (device, attribute) pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDevice`] or [`Error::UnknownAttribute`] if the
    /// pair is not configured, or [`Error::AlreadySubscribed`] if the
    /// address is already present.
    pub fn subscribe(
        &mut self,
        address: SubscriberAddress,
        device: &str,
        attribute: &str,
    ) -> Result<()> {
        self.check_subscribable(address, device, attribute)?;
        self.push(address, device, attribute);
        tracing::debug!(peer = %address, device = %device, attribute = %attribute, "Subscribed");
        Ok(())
    }

    /// Subscribes `address` to several attributes of one device, all or
    /// nothing.
    ///
    /// Every pair is checked before any is registered; naming the same
    /// attribute twice counts as already subscribed.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe). The registry is unchanged
    /// when an error is returned.
    pub fn subscribe_all(
        &mut self,
        address: SubscriberAddress,
        device: &str,
        attributes: &[String],
    ) -> Result<()> {
        for (i, attribute) in attributes.iter().enumerate() {
            self.check_subscribable(address, device, attribute)?;
            if attributes[..i].contains(attribute) {
                return Err(Error::AlreadySubscribed {
                    device: device.to_string(),
                    attribute: attribute.clone(),
                });
            }
        }
        for attribute in attributes {
            self.push(address, device, attribute);
        }
        tracing::debug!(
            peer = %address,
            device = %device,
            ?attributes,
            "Subscribed to attributes"
        );
        Ok(())
    }

    /// Removes `address` from every subscriber list.
    ///
    /// Returns the number of subscriptions removed; zero is not an error.
    pub fn unsubscribe_all(&mut self, address: SubscriberAddress) -> usize {
        let mut removed = 0;
        for bucket in self.buckets.values_mut().flat_map(BTreeMap::values_mut) {
            let before = bucket.len();
            bucket.retain(|subscriber| *subscriber != address);
            removed += before - bucket.len();
        }
        tracing::debug!(peer = %address, removed, "Unsubscribed from all attributes");
        removed
    }

    /// Returns the subscribers of (device, attribute) in subscription order.
    ///
    /// Unknown pairs have no subscribers.
    #[must_use]
    pub fn subscribers(&self, device: &str, attribute: &str) -> &[SubscriberAddress] {
        self.bucket(device, attribute)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the (device, attribute) pairs `address` is subscribed to.
    #[must_use]
    pub fn subscriptions_of(&self, address: SubscriberAddress) -> Vec<(&str, &str)> {
        self.buckets
            .iter()
            .flat_map(|(device, attributes)| {
                attributes
                    .iter()
                    .filter(move |(_, bucket)| bucket.contains(&address))
                    .map(move |(attribute, _)| (device.as_str(), attribute.as_str()))
            })
            .collect()
    }

    /// Returns the total number of subscriptions across all pairs.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Returns the configured device names.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }
}
