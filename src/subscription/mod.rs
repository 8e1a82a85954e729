// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscriber bookkeeping.
//!
//! The [`SubscriptionRegistry`] records which network addresses watch which
//! (device, attribute) pairs. Its keys are fixed when it is built from the
//! configured devices; only the subscriber lists change afterwards.
//!
//! # Examples
//!
//! ```
//! use devnotify::subscription::SubscriptionRegistry;
//!
//! let mut registry = SubscriptionRegistry::new().with_device("relay", ["ch1", "ch2"]);
//! let client = "127.0.0.1:40000".parse().unwrap();
//!
//! registry.subscribe(client, "relay", "ch1").unwrap();
//! assert_eq!(registry.subscribers("relay", "ch1"), &[client]);
//!
//! // A second subscription to the same pair is rejected
//! assert!(registry.subscribe(client, "relay", "ch1").is_err());
//!
//! registry.unsubscribe_all(client);
//! assert!(registry.subscribers("relay", "ch1").is_empty());
//! ```

mod registry;

pub use registry::{SubscriberAddress, SubscriptionRegistry};
