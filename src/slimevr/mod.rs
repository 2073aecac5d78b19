//! SlimeVR server protocol
//!
//! Packet encoding for the SlimeVR UDP tracker protocol, the datagram sink the
//! packets are written to, and the sender that ties the two together.

pub mod protocol;
pub mod sender;
pub mod sink;

use thiserror::Error;

// Re-export commonly used types
pub use protocol::{OutboundPacket, PacketEncoder, PacketHeader, PacketType};
pub use sender::PacketSender;
pub use sink::{DatagramSink, UdpSink};

/// Default SlimeVR server host.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default SlimeVR server UDP port.
pub const DEFAULT_SERVER_PORT: u16 = 6969;

/// Errors on the server leg.
#[derive(Debug, Error)]
pub enum SlimeError {
    #[error("Failed to resolve server address {0}")]
    Resolve(String),

    #[error("Failed to bind UDP socket: {0}")]
    Bind(String),

    #[error("UDP send failed: {0}")]
    Send(String),
}
