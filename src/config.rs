// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration.
//!
//! A configuration names the UDP address to bind and the static set of
//! devices, each with the path of its record file. It is either built in
//! code or loaded from a JSON file:
//!
//! ```text
//! {
//!   "bind": "127.0.0.1:9999",
//!   "devices": [
//!     { "name": "relay", "path": "devices/relay.json" }
//!   ],
//!   "event_capacity": 64
//! }
//! ```
//!
//! `bind` and `event_capacity` are optional. Relative device paths are
//! resolved against the directory of the configuration file.

use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::DEFAULT_CHANNEL_CAPACITY;

/// Default server address: loopback, port 9999.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9999);

/// A configured device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name used in requests.
    pub name: String,
    /// Path of the device's record file.
    pub path: PathBuf,
}

/// Configuration for a [`Server`](crate::server::Server).
///
/// # Examples
///
/// ```
/// use devnotify::config::ServerConfig;
///
/// let config = ServerConfig::new()
///     .with_bind("127.0.0.1:0".parse().unwrap())
///     .with_device("relay", "devices/relay.json");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.devices[0].name, "relay");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// UDP address to bind.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// The static device set.
    pub devices: Vec<DeviceConfig>,
    /// Capacity of the change event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_bind() -> SocketAddr {
    DEFAULT_BIND
}

fn default_event_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfig {
    /// Creates a configuration with default settings and no devices.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind: DEFAULT_BIND,
            devices: Vec::new(),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// Adds a device.
    #[must_use]
    pub fn with_device(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.devices.push(DeviceConfig {
            name: name.into(),
            path: path.into(),
        });
        self
    }

    /// Sets the change event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Parses a configuration from JSON text.
    ///
    /// Relative device paths are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read '{}': {e}", path.display())))?;
        let mut config = Self::from_json(&text)?;

        if let Some(base) = path.parent() {
            for device in &mut config.devices {
                if device.path.is_relative() {
                    device.path = base.join(&device.path);
                }
            }
        }
        tracing::info!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
        Ok(config)
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if there are no devices, a device name is
    /// empty or repeated, two devices share a path, or the event capacity
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(Error::Config("no devices configured".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be positive".to_string()));
        }

        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() || device.name.split_whitespace().count() != 1 {
                return Err(Error::Config(format!(
                    "invalid device name '{}'",
                    device.name
                )));
            }
            if !names.insert(device.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate device name '{}'",
                    device.name
                )));
            }
            if !paths.insert(device.path.as_path()) {
                return Err(Error::Config(format!(
                    "path '{}' is used by more than one device",
                    device.path.display()
                )));
            }
        }
        Ok(())
    }

    /// Returns `(name, path)` pairs of the configured devices.
    pub fn device_paths(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.devices
            .iter()
            .map(|device| (device.name.as_str(), device.path.as_path()))
    }
}
