// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command routing.
//!
//! The [`CommandRouter`] turns one request string into one [`Response`].
//! It never fails: parse errors, unknown names, validation failures and
//! store I/O errors all become failure responses for the requester.
//!
//! # Architecture
//!
//! ```text
//! "set relay ch1 ON" from 127.0.0.1:40000
//!                     ↓
//!            Command::from_str()
//!                     ↓
//!       Command::Set { relay, [(ch1, ON)] }
//!                     ↓
//!       DeviceStore::set() (validate all, then write)
//!                     ↓
//!     Response { success: true, message: {ch1: ON, ...} }
//! ```

use crate::error::{Error, Result};
use crate::protocol::{Command, Response};
use crate::store::{DeviceStore, SetOutcome};
use crate::subscription::{SubscriberAddress, SubscriptionRegistry};

/// Dispatches parsed requests to the store and the subscription registry.
#[derive(Debug)]
pub struct CommandRouter<'a, S: ?Sized> {
    store: &'a mut S,
    registry: &'a mut SubscriptionRegistry,
}

impl<'a, S: DeviceStore + ?Sized> CommandRouter<'a, S> {
    /// Creates a router over the given store and registry.
    pub fn new(store: &'a mut S, registry: &'a mut SubscriptionRegistry) -> Self {
        Self { store, registry }
    }

    /// Handles one request from `from` and builds its response.
    pub fn handle(&mut self, request: &str, from: SubscriberAddress) -> Response {
        let result = request
            .parse::<Command>()
            .and_then(|command| self.execute(&command, from));

        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(peer = %from, request = %request.trim_end(), error = %e, "Request failed");
                e.into_response()
            }
        }
    }

    /// Executes an already parsed command.
    ///
    /// # Errors
    ///
    /// Returns the error that the failure response is built from.
    pub fn execute(&mut self, command: &Command, from: SubscriberAddress) -> Result<Response> {
        tracing::debug!(peer = %from, %command, "Executing command");
        match command {
            Command::Get { device, attribute } => self.get(device, attribute.as_deref()),
            Command::Set { device, targets } => self.set(device, targets),
            Command::Subscribe { device, attributes } => self.subscribe(from, device, attributes),
            Command::Unsubscribe => Ok(self.unsubscribe(from)),
        }
    }

    fn get(&self, device: &str, attribute: Option<&str>) -> Result<Response> {
        match attribute {
            Some(attribute) => {
                let value = self.store.state(device, attribute)?;
                Ok(Response::text(true, value))
            }
            None => Ok(Response::states(self.store.states(device)?)),
        }
    }

    fn set(&mut self, device: &str, targets: &[(String, String)]) -> Result<Response> {
        match self.store.set(device, targets)? {
            SetOutcome::Applied(states) => {
                tracing::info!(device = %device, ?states, "Device states modified");
                Ok(Response::states(states))
            }
            SetOutcome::Unchanged => Err(Error::NoChangeRequested(device.to_string())),
        }
    }

    fn subscribe(
        &mut self,
        from: SubscriberAddress,
        device: &str,
        attributes: &[String],
    ) -> Result<Response> {
        self.registry.subscribe_all(from, device, attributes)?;
        Ok(Response::text(
            true,
            format!("Subscribed {attributes:?} attribute(s) of device '{device}'."),
        ))
    }

    fn unsubscribe(&mut self, from: SubscriberAddress) -> Response {
        self.registry.unsubscribe_all(from);
        Response::text(true, "Unsubscribed from all events of all devices.")
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::protocol::DeviceStates;
    use crate::store::{FileStore, MemoryStore};

    struct Fixture {
        store: MemoryStore,
        registry: SubscriptionRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new()
                    .with_attribute("relay", "ch1", "OFF", &["ON", "OFF"])
                    .with_attribute("relay", "ch2", "OFF", &["ON", "OFF"])
                    .with_attribute("relay", "mode", "auto", &["auto", "manual"]),
                registry: SubscriptionRegistry::new().with_device("relay", ["ch1", "ch2", "mode"]),
            }
        }

        fn send(&mut self, request: &str) -> Response {
            self.send_from(request, client())
        }

        fn send_from(&mut self, request: &str, from: SocketAddr) -> Response {
            CommandRouter::new(&mut self.store, &mut self.registry).handle(request, from)
        }
    }

    fn client() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    fn text(response: &Response) -> &str {
        response.message.as_text().unwrap()
    }

    #[test]
    fn get_all_attributes() {
        let mut fx = Fixture::new();
        let response = fx.send("get relay");
        assert!(response.success);
        let states = response.message.as_states().unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states["mode"], "auto");
    }

    #[test]
    fn get_single_attribute() {
        let mut fx = Fixture::new();
        let response = fx.send("get relay ch1");
        assert_eq!(response, Response::text(true, "OFF"));
    }

    #[test]
    fn get_unknown_names_offending_token() {
        let mut fx = Fixture::new();
        let response = fx.send("get lamp");
        assert!(!response.success);
        assert!(text(&response).contains("'lamp'"));

        let response = fx.send("get relay ch7");
        assert!(!response.success);
        assert!(text(&response).contains("'ch7'"));
    }

    #[test]
    fn get_wrong_token_count() {
        let mut fx = Fixture::new();
        assert!(!fx.send("get").success);
        assert!(!fx.send("get relay ch1 ch2").success);
    }

    #[test]
    fn set_then_get_round_trip() {
        let mut fx = Fixture::new();
        let response = fx.send("set relay ch1 ON ch2 OFF");
        assert!(response.success);
        let states = response.message.as_states().unwrap();
        assert_eq!(states["ch1"], "ON");
        assert_eq!(states["ch2"], "OFF");

        let expected = DeviceStates::from([
            ("ch1".to_string(), "ON".to_string()),
            ("ch2".to_string(), "OFF".to_string()),
            ("mode".to_string(), "auto".to_string()),
        ]);
        assert_eq!(fx.send("get relay"), Response::states(expected));
        assert_eq!(fx.send("get relay ch1"), Response::text(true, "ON"));
    }

    #[test]
    fn set_odd_pair_count_is_invalid_command() {
        let mut fx = Fixture::new();
        let response = fx.send("set relay ch1");
        assert!(!response.success);
        assert!(text(&response).starts_with("Device set message"));
    }

    #[test]
    fn set_with_invalid_later_pair_writes_nothing() {
        let mut fx = Fixture::new();
        let before = fx.send("get relay");

        let response = fx.send("set relay ch1 ON ch2 DIM");
        assert!(!response.success);
        assert!(text(&response).contains("ch2"));
        assert!(text(&response).contains("\"ON\", \"OFF\""));

        assert_eq!(fx.send("get relay"), before);
    }

    #[test]
    fn set_unknown_attribute_lists_device_attributes() {
        let mut fx = Fixture::new();
        let response = fx.send("set relay ch9 ON");
        assert_eq!(
            response,
            Response::failure(
                "No attribute 'ch9' found for device 'relay' attributes list [\"ch1\", \"ch2\", \"mode\"]!"
            )
        );
        assert_eq!(fx.send("get relay ch1"), Response::text(true, "OFF"));
    }

    #[test]
    fn set_without_changes_is_reported() {
        let mut fx = Fixture::new();
        let response = fx.send("set relay ch1 OFF");
        assert_eq!(response, Response::failure("No changes for device 'relay'."));
    }

    #[test]
    fn subscribe_reports_attributes() {
        let mut fx = Fixture::new();
        let response = fx.send("subscribe relay ch1 ch2");
        assert!(response.success);
        assert_eq!(
            text(&response),
            "Subscribed [\"ch1\", \"ch2\"] attribute(s) of device 'relay'."
        );
        assert_eq!(fx.registry.subscribers("relay", "ch1"), &[client()]);
    }

    #[test]
    fn subscribe_twice_is_rejected() {
        let mut fx = Fixture::new();
        assert!(fx.send("subscribe relay ch1").success);
        let response = fx.send("subscribe relay ch1");
        assert!(!response.success);
        assert!(text(&response).starts_with("Already subscribed"));
        assert_eq!(fx.registry.subscribers("relay", "ch1").len(), 1);
    }

    #[test]
    fn subscribe_failure_leaves_registry_unchanged() {
        let mut fx = Fixture::new();
        let response = fx.send("subscribe relay ch1 nope");
        assert!(!response.success);
        assert_eq!(fx.registry.subscription_count(), 0);

        let response = fx.send("subscribe lamp ch1");
        assert!(!response.success);
        assert!(text(&response).contains("'lamp'"));
    }

    #[test]
    fn subscribe_shape_errors() {
        let mut fx = Fixture::new();
        assert!(text(&fx.send("subscribe")).starts_with("No device provided."));
        assert!(text(&fx.send("subscribe relay")).contains("No attributes"));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut fx = Fixture::new();
        let other = SocketAddr::from(([127, 0, 0, 1], 40001));
        fx.send_from("subscribe relay ch1", other);

        assert!(fx.send("unsubscribe").success);
        assert!(fx.send("unsubscribe extra tokens").success);
        assert_eq!(fx.registry.subscription_count(), 1);

        fx.send("subscribe relay ch1 mode");
        assert!(fx.send("unsubscribe").success);
        assert_eq!(fx.registry.subscribers("relay", "ch1"), &[other]);
        assert!(fx.registry.subscribers("relay", "mode").is_empty());
    }

    #[test]
    fn blank_request_is_invalid_command() {
        let mut fx = Fixture::new();
        let response = fx.send("   \n");
        assert_eq!(
            response,
            Response::failure("Invalid request command. Choose from get|set|subscribe|unsubscribe")
        );
    }

    #[test]
    fn store_errors_become_failure_responses() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("relay.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let mut store = FileStore::new([
            ("relay", broken),
            ("lamp", dir.path().join("missing.json")),
        ]);
        let mut registry = SubscriptionRegistry::new();
        let mut router = CommandRouter::new(&mut store, &mut registry);

        let requests = [
            "get relay",
            "get relay ch1",
            "set relay ch1 ON",
            "get lamp",
            "set lamp on ON",
        ];
        for request in requests {
            let response = router.handle(request, client());
            assert!(!response.success, "{request}");
            assert!(text(&response).starts_with("store error: "), "{request}: {response:?}");
        }
    }

    #[test]
    fn unknown_verb() {
        let mut fx = Fixture::new();
        let response = fx.send("toggle relay ch1");
        assert_eq!(
            response,
            Response::failure("Invalid request command. Choose from get|set|subscribe|unsubscribe")
        );
    }
}
