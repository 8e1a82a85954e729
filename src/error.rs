// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `devnotify` server.
//!
//! Every command-path failure is a variant of [`Error`]. The command router
//! converts these into failure [`Response`](crate::protocol::Response)s, so
//! none of them ever reaches the reactor loop.

use thiserror::Error;

use crate::protocol::Response;

/// The main error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown verb or wrong token count.
    #[error("{0}")]
    InvalidCommand(String),

    /// The device is not configured.
    #[error("No device '{0}' found!")]
    UnknownDevice(String),

    /// The device exists but has no such attribute.
    #[error("No attribute '{attribute}' found for device '{device}' attributes list {known:?}!")]
    UnknownAttribute {
        /// The device that was addressed.
        device: String,
        /// The attribute that does not exist.
        attribute: String,
        /// The attributes the device does have.
        known: Vec<String>,
    },

    /// A value outside the attribute's allowed set.
    #[error(
        "State '{value}' not in device '{device}' attribute '{attribute}' possible states {allowed:?}!"
    )]
    InvalidValue {
        /// The device that was addressed.
        device: String,
        /// The attribute being set.
        attribute: String,
        /// The rejected value.
        value: String,
        /// The values the attribute accepts.
        allowed: Vec<String>,
    },

    /// A `set` whose targets all equal the current values.
    #[error("No changes for device '{0}'.")]
    NoChangeRequested(String),

    /// The address already watches this (device, attribute) pair.
    #[error("Already subscribed to attribute '{attribute}' of device '{device}'.")]
    AlreadySubscribed {
        /// The device that was addressed.
        device: String,
        /// The attribute already subscribed to.
        attribute: String,
    },

    /// The backing resource of a device could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Inbound bytes or a received response could not be decoded.
    #[error("Unable to decode request: {0}")]
    Decode(String),

    /// Invalid server configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The change event source could not be started.
    #[error("watcher error: {0}")]
    Watch(String),

    /// Socket level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Converts this error into a failure response for the requester.
    #[must_use]
    pub fn into_response(self) -> Response {
        Response::failure(self.to_string())
    }
}

/// Errors raised by a [`DeviceStore`](crate::store::DeviceStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The device record could not be read or written.
    #[error("failed to access '{path}': {source}")]
    Io {
        /// Path of the device record.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The device record is not in the expected format.
    #[error("malformed record '{path}': {message}")]
    Format {
        /// Path of the device record.
        path: String,
        /// Description of the problem.
        message: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
