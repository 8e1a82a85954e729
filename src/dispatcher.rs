// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change notification fan-out.
//!
//! On a [`ChangeEvent`] the [`NotificationDispatcher`] reads the device's
//! fresh state, diffs it against the [`StateCache`], notifies the
//! subscribers of every changed attribute and then records the new value.
//!
//! ```text
//! ChangeEvent { device: "relay" }
//!                ↓
//!      DeviceStore::states("relay")
//!                ↓
//!   StateCache::diff() → [ch1: OFF -> ON]
//!                ↓
//!  registry.subscribers("relay", "ch1") → [a, b]
//!                ↓
//!   sink.send(a, ..), sink.send(b, ..)
//!                ↓
//!       StateCache::apply(ch1 = ON)
//! ```

use std::net::SocketAddr;

use crate::error::Result;
use crate::event::ChangeEvent;
use crate::protocol::Response;
use crate::state::StateCache;
use crate::store::DeviceStore;
use crate::subscription::{SubscriberAddress, SubscriptionRegistry};

/// Outbound path for unsolicited notifications.
///
/// Implementations must not wait for any reply.
pub trait NotificationSink {
    /// Sends `response` to `to`.
    fn send(&mut self, to: SubscriberAddress, response: &Response);
}

impl NotificationSink for Vec<(SocketAddr, Response)> {
    fn send(&mut self, to: SubscriberAddress, response: &Response) {
        self.push((to, response.clone()));
    }
}

/// Turns device change events into targeted notifications.
#[derive(Debug)]
pub struct NotificationDispatcher<'a, S: ?Sized> {
    store: &'a S,
    registry: &'a SubscriptionRegistry,
    cache: &'a mut StateCache,
}

impl<'a, S: DeviceStore + ?Sized> NotificationDispatcher<'a, S> {
    /// Creates a dispatcher. The store is only read.
    pub fn new(store: &'a S, registry: &'a SubscriptionRegistry, cache: &'a mut StateCache) -> Self {
        Self {
            store,
            registry,
            cache,
        }
    }

    /// Processes one change event.
    ///
    /// Every changed attribute is cached, whether or not it has
    /// subscribers. Returns the number of notifications sent.
    ///
    /// # Errors
    ///
    /// Returns the store error if the device cannot be read. The cache is
    /// left untouched so the next event reconciles from the last good
    /// values.
    pub fn dispatch(
        &mut self,
        event: &ChangeEvent,
        sink: &mut impl NotificationSink,
    ) -> Result<usize> {
        let device = event.device.as_str();
        let fresh = self.store.states(device)?;
        let changes = self.cache.diff(device, &fresh);
        if changes.is_empty() {
            tracing::trace!(device = %device, "Change event without attribute changes");
            return Ok(0);
        }

        let mut sent = 0;
        for change in &changes {
            let subscribers = self.registry.subscribers(device, &change.attribute);
            tracing::debug!(
                device = %device,
                %change,
                subscribers = subscribers.len(),
                "Attribute changed"
            );
            if !subscribers.is_empty() {
                let notification = change.to_notification(device);
                for address in subscribers {
                    sink.send(*address, &notification);
                    sent += 1;
                }
            }
            self.cache.apply(device, change);
        }
        Ok(sent)
    }
}
