//! Serialized packet transmission.
//!
//! The poll loop and the heartbeat loop both send through one [`PacketSender`].
//! Sequence assignment, encoding and the datagram write happen under a single
//! lock, so packets leave in sequence order with no gaps or duplicates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::protocol::{OutboundPacket, PacketEncoder};
use super::sink::DatagramSink;
use super::SlimeError;

/// Shared sender owning the encoder and the sink.
pub struct PacketSender {
    encoder: Mutex<PacketEncoder>,
    sink: Box<dyn DatagramSink>,
    packets_sent: AtomicU64,
    send_errors: AtomicU64,
}

impl PacketSender {
    /// Create a sender with a fresh encoder.
    pub fn new(sink: Box<dyn DatagramSink>) -> Self {
        Self::with_encoder(PacketEncoder::new(), sink)
    }

    /// Create a sender around an existing encoder.
    pub fn with_encoder(encoder: PacketEncoder, sink: Box<dyn DatagramSink>) -> Self {
        Self {
            encoder: Mutex::new(encoder),
            sink,
            packets_sent: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
        }
    }

    /// Send the handshake for a tracker.
    pub fn send_handshake(&self, tracker_id: u8) -> Result<u64, SlimeError> {
        self.transmit(|encoder| encoder.encode_handshake(tracker_id))
    }

    /// Send a rotation for a tracker.
    pub fn send_orientation(
        &self,
        tracker_id: u8,
        quaternion: [f32; 4],
    ) -> Result<u64, SlimeError> {
        self.transmit(|encoder| encoder.encode_orientation(tracker_id, quaternion))
    }

    /// Send a battery status.
    pub fn send_battery(&self, tracker_id: u8, battery_pct: u8) -> Result<u64, SlimeError> {
        self.transmit(|encoder| encoder.encode_battery(tracker_id, battery_pct))
    }

    /// Send a heartbeat.
    pub fn send_heartbeat(&self) -> Result<u64, SlimeError> {
        self.transmit(PacketEncoder::encode_heartbeat)
    }

    /// Sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u64 {
        self.encoder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_sequence()
    }

    /// Packets handed to the sink successfully.
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    /// Packets dropped because the sink failed.
    pub fn send_errors(&self) -> u64 {
        self.send_errors.load(Ordering::Relaxed)
    }

    /// Encode and send one packet while holding the encoder lock.
    ///
    /// A failed send still consumes its sequence number.
    fn transmit<F>(&self, encode: F) -> Result<u64, SlimeError>
    where
        F: FnOnce(&mut PacketEncoder) -> OutboundPacket,
    {
        // The encoder is only mutated by `encode`, which cannot leave it half-updated.
        let mut encoder = self.encoder.lock().unwrap_or_else(PoisonError::into_inner);
        let packet = encode(&mut *encoder);

        match self.sink.send(packet.as_bytes()) {
            Ok(()) => {
                self.packets_sent.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "Sent {:?} #{} ({} bytes)",
                    packet.packet_type(),
                    packet.sequence(),
                    packet.len()
                );
                Ok(packet.sequence())
            }
            Err(e) => {
                self.send_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Dropped {:?} #{}: {}",
                    packet.packet_type(),
                    packet.sequence(),
                    e
                );
                Err(e)
            }
        }
    }
}
