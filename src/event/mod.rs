// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device change events.
//!
//! Change event sources push [`ChangeEvent`]s into a bounded channel that
//! only the server's reactor loop consumes. With the `watch` feature,
//! [`FileWatcher`] is such a source for [`FileStore`](crate::store::FileStore)
//! records.
//!
//! # Examples
//!
//! ```
//! use devnotify::event::{self, ChangeEvent};
//!
//! let (tx, mut rx) = event::channel(8);
//! tx.try_send(ChangeEvent::new("relay")).unwrap();
//! assert_eq!(rx.try_recv().unwrap().device, "relay");
//! ```

#[cfg(feature = "watch")]
mod watcher;

#[cfg(feature = "watch")]
pub use watcher::FileWatcher;

use tokio::sync::mpsc;

/// Default capacity of the change event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Signal that a device's backing resource was modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Name of the modified device.
    pub device: String,
}

impl ChangeEvent {
    /// Creates an event for `device`.
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

/// Creates the bounded channel between event sources and the server.
#[must_use]
pub fn channel(capacity: usize) -> (mpsc::Sender<ChangeEvent>, mpsc::Receiver<ChangeEvent>) {
    mpsc::channel(capacity)
}
