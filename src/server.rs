// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single reactor loop.
//!
//! A [`Server`] owns the gateway, the store, the subscription registry and
//! the state cache. [`Server::run`] multiplexes inbound datagrams and
//! change events and handles each to completion before taking the next, so
//! the registry and cache are only ever touched from one place.

use std::future::Future;
use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::dispatcher::NotificationDispatcher;
use crate::error::Result;
use crate::event::ChangeEvent;
use crate::gateway::Gateway;
use crate::router::CommandRouter;
use crate::state::StateCache;
use crate::store::{DeviceStore, FileStore};
use crate::subscription::SubscriptionRegistry;

/// Device state server.
///
/// # Examples
///
/// ```no_run
/// use devnotify::event;
/// use devnotify::server::Server;
/// use devnotify::store::MemoryStore;
///
/// # async fn example() -> devnotify::Result<()> {
/// let store = MemoryStore::new().with_attribute("relay", "ch1", "OFF", &["ON", "OFF"]);
/// let server = Server::bind("127.0.0.1:9999".parse().unwrap(), store).await?;
///
/// let (_events_tx, events_rx) = event::channel(64);
/// server.run(events_rx, async {
///     let _ = tokio::signal::ctrl_c().await;
/// }).await
/// # }
/// ```
#[derive(Debug)]
pub struct Server<S> {
    gateway: Gateway,
    store: S,
    registry: SubscriptionRegistry,
    cache: StateCache,
}

impl Server<FileStore> {
    /// Binds a server over the file records named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a device record
    /// cannot be read, or the socket cannot be bound.
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let store = FileStore::new(config.device_paths());
        Self::bind(config.bind, store).await
    }
}

impl<S: DeviceStore> Server<S> {
    /// Binds a server to `addr`.
    ///
    /// The registry and the cache are seeded from the current state of
    /// every device in `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if a device cannot be read or the socket cannot be
    /// bound.
    pub async fn bind(addr: SocketAddr, store: S) -> Result<Self> {
        let (registry, cache) = seed(&store)?;
        let gateway = Gateway::bind(addr).await?;
        tracing::info!(addr = %gateway.local_addr()?, "Starting UDP server");
        Ok(Self {
            gateway,
            store,
            registry,
            cache,
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.gateway.local_addr()
    }

    /// Runs the reactor loop until `shutdown` completes.
    ///
    /// A closed event channel only disables change notifications; requests
    /// keep being served.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; socket errors are logged per datagram.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);
        let mut events_open = true;

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Shutting down");
                    break;
                }
                received = self.gateway.recv() => match received {
                    Ok((request, peer)) => self.handle_request(request, peer).await,
                    Err(e) => tracing::warn!(error = %e, "Failed to receive datagram"),
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(&event),
                    None => {
                        tracing::warn!("Change event source closed, notifications disabled");
                        events_open = false;
                    }
                },
            }
        }
        Ok(())
    }

    async fn handle_request(&mut self, request: Result<String>, peer: SocketAddr) {
        let response = match request {
            Ok(text) => {
                tracing::debug!(peer = %peer, request = %text.trim_end(), "Received request");
                CommandRouter::new(&mut self.store, &mut self.registry).handle(&text, peer)
            }
            Err(e) => {
                tracing::warn!(peer = %peer, error = %e, "Undecodable datagram");
                e.into_response()
            }
        };
        if let Err(e) = self.gateway.reply(peer, &response).await {
            tracing::warn!(peer = %peer, error = %e, "Failed to send response");
        }
    }

    fn handle_event(&mut self, event: &ChangeEvent) {
        tracing::debug!(device = %event.device, "Changes in device");
        let mut dispatcher = NotificationDispatcher::new(&self.store, &self.registry, &mut self.cache);
        match dispatcher.dispatch(event, &mut self.gateway) {
            Ok(sent) if sent > 0 => {
                tracing::info!(device = %event.device, sent, "Notifications sent");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(device = %event.device, error = %e, "Error processing device update");
            }
        }
    }
}

/// Builds the registry and cache from the current store contents.
fn seed<S: DeviceStore + ?Sized>(store: &S) -> Result<(SubscriptionRegistry, StateCache)> {
    let mut registry = SubscriptionRegistry::new();
    let mut cache = StateCache::new();
    for device in store.device_names() {
        let states = store.states(&device)?;
        registry = registry.with_device(device.clone(), states.keys().cloned());
        cache = cache.with_device(device, states);
    }
    Ok((registry, cache))
}
