//! Datagram output to the SlimeVR server.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use super::SlimeError;

/// Destination for encoded packets.
///
/// Each call transmits exactly one whole packet.
pub trait DatagramSink: Send + Sync {
    /// Send one packet.
    fn send(&self, bytes: &[u8]) -> Result<(), SlimeError>;
}

/// Unicast UDP sink bound to an ephemeral local port.
pub struct UdpSink {
    socket: UdpSocket,
    destination: SocketAddr,
}

impl UdpSink {
    /// Resolve `destination` and bind a local socket of the matching family.
    pub fn connect(destination: &str) -> Result<Self, SlimeError> {
        let destination = destination
            .to_socket_addrs()
            .map_err(|e| SlimeError::Resolve(format!("{}: {}", destination, e)))?
            .next()
            .ok_or_else(|| SlimeError::Resolve(destination.to_string()))?;

        let local = if destination.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };

        let socket = UdpSocket::bind(local).map_err(|e| SlimeError::Bind(e.to_string()))?;

        Ok(Self {
            socket,
            destination,
        })
    }

    /// Server address packets are sent to.
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

impl DatagramSink for UdpSink {
    fn send(&self, bytes: &[u8]) -> Result<(), SlimeError> {
        self.socket
            .send_to(bytes, self.destination)
            .map(|_| ())
            .map_err(|e| SlimeError::Send(e.to_string()))
    }
}
