// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-observed device state.
//!
//! The [`StateCache`] remembers the value of every attribute as last seen by
//! the notification dispatcher. Diffing a fresh store read against it
//! yields the [`AttributeChange`]s that subscribers are told about.
//!
//! # Examples
//!
//! ```
//! use devnotify::protocol::DeviceStates;
//! use devnotify::state::StateCache;
//!
//! let initial = DeviceStates::from([("ch1".to_string(), "OFF".to_string())]);
//! let mut cache = StateCache::new().with_device("relay", initial);
//!
//! let fresh = DeviceStates::from([("ch1".to_string(), "ON".to_string())]);
//! let changes = cache.diff("relay", &fresh);
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].old, "OFF");
//!
//! cache.apply("relay", &changes[0]);
//! assert_eq!(cache.value("relay", "ch1"), Some("ON"));
//! ```

mod cache;
mod change;

pub use cache::StateCache;
pub use change::AttributeChange;
