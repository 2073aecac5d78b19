//! SlimeBridge - USB receiver to SlimeVR server bridge
//!
//! Reads fixed-size frames from a SlimeVR tracker receiver over USB HID, decodes
//! the compact tracker wire format, and forwards each reading to a SlimeVR server
//! as UDP packets, while keeping the connection alive with periodic heartbeats.

pub mod bridge;
pub mod config;
pub mod receiver;
pub mod slimevr;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeReport, BridgeSettings, BridgeState, StopSignal};
pub use config::BridgeConfig;
pub use receiver::frame::{decode_frame, SensorReading};
pub use slimevr::protocol::PacketEncoder;
pub use slimevr::sender::PacketSender;
