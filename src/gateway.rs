// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Datagram gateway.
//!
//! The [`Gateway`] owns the UDP socket. It decodes inbound datagrams into
//! request text and is the only place responses and notifications are
//! written to the network.

use std::net::SocketAddr;

use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::dispatcher::NotificationSink;
use crate::error::{Error, Result};
use crate::protocol::Response;
use crate::subscription::SubscriberAddress;

/// Largest datagram the gateway accepts.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// UDP socket wrapper for requests, responses and notifications.
#[derive(Debug)]
pub struct Gateway {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl Gateway {
    /// Binds a gateway to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the socket cannot be bound.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self::from_socket(socket))
    }

    /// Wraps an already bound socket.
    #[must_use]
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket,
            buf: vec![0; MAX_DATAGRAM_SIZE],
        }
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address cannot be queried.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Waits for the next datagram.
    ///
    /// The outer error is a socket failure; the inner one is a datagram
    /// that could not be decoded and should be answered with a decode
    /// error response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if receiving fails.
    pub async fn recv(&mut self) -> Result<(Result<String>, SocketAddr)> {
        let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
        let request = decode_request(&self.buf[..len]).map(ToString::to_string);
        tracing::debug!(peer = %peer, len, "Received datagram");
        Ok((request, peer))
    }

    /// Sends a response to the peer that made a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if sending fails.
    pub async fn reply(&self, to: SocketAddr, response: &Response) -> Result<()> {
        tracing::debug!(peer = %to, ?response, "Sending response");
        self.socket.send_to(&response.encode(), to).await?;
        Ok(())
    }
}

impl NotificationSink for Gateway {
    fn send(&mut self, to: SubscriberAddress, response: &Response) {
        tracing::debug!(peer = %to, ?response, "Sending notification");
        if let Err(e) = self.socket.try_send_to(&response.encode(), to) {
            tracing::warn!(peer = %to, error = %e, "Failed to send notification");
        }
    }
}

/// Decodes datagram bytes into request text.
///
/// # Errors
///
/// Returns [`Error::Decode`] for invalid UTF-8. Blank text decodes fine and
/// is rejected later as an invalid command.
pub fn decode_request(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
}
