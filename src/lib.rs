// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `devnotify` - query, change and watch device attributes over UDP.
//!
//! Clients send whitespace separated text commands in single datagrams and
//! receive JSON responses. Clients that subscribe to attributes also
//! receive a notification whenever one of those attributes changes,
//! whoever made the change.
//!
//! # Protocol
//!
//! ```text
//! get <device> [<attribute>]
//! set <device> <attr1> <val1> [<attr2> <val2> ...]
//! subscribe <device> <attr1> [<attr2> ...]
//! unsubscribe
//! ```
//!
//! Every reply and notification is `{"success": <bool>, "message": ...}`
//! where the message is a string or a string to string map. See
//! [`protocol`].
//!
//! # Components
//!
//! - [`store`]: attribute values with their allowed sets, behind the
//!   [`DeviceStore`](store::DeviceStore) trait
//! - [`subscription`]: which addresses watch which (device, attribute)
//! - [`router`]: request text to response
//! - [`dispatcher`]: change event to targeted notifications
//! - [`gateway`]: the UDP socket
//! - [`server`]: the reactor loop tying them together
//! - [`event`]: change events and the file watcher producing them
//!
//! # Quick Start
//!
//! ```no_run
//! use devnotify::config::ServerConfig;
//! use devnotify::event::{self, FileWatcher};
//! use devnotify::server::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> devnotify::Result<()> {
//!     let config = ServerConfig::load("devices.json")?;
//!
//!     let (tx, rx) = event::channel(config.event_capacity);
//!     let _watcher = FileWatcher::spawn(config.device_paths(), tx)?;
//!
//!     let server = Server::from_config(&config).await?;
//!     server
//!         .run(rx, async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod gateway;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub mod subscription;

pub use config::{DeviceConfig, ServerConfig};
pub use dispatcher::{NotificationDispatcher, NotificationSink};
pub use error::{Error, Result, StoreError};
pub use event::ChangeEvent;
pub use gateway::Gateway;
pub use protocol::{Command, DeviceStates, Message, Response};
pub use router::CommandRouter;
pub use server::Server;
pub use state::{AttributeChange, StateCache};
pub use store::{DeviceStore, FileStore, MemoryStore, SetOutcome};
pub use subscription::{SubscriberAddress, SubscriptionRegistry};
