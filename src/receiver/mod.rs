//! Tracker Receiver Integration
//!
//! Inbound side of the bridge: the USB HID receiver that multiplexes up to 64
//! trackers over one report stream, and the decoder for its frame format.

pub mod device;
pub mod frame;

use thiserror::Error;

// Re-export main types
pub use device::{DeviceOpener, HidReceiver, HidReceiverOpener, ReceiverDevice, ReceiverInfo};
pub use frame::{decode_frame, FrameKind, OrientationData, SensorReading};

/// pid.codes vendor ID used by the CH592 receiver firmware
pub const DEFAULT_VENDOR_ID: u16 = 0x1209;

/// SlimeVR CH592 receiver product ID
pub const DEFAULT_PRODUCT_ID: u16 = 0x5634;

/// HID input report size produced by the receiver
pub const DEFAULT_REPORT_SIZE: usize = 64;

/// Receiver-related errors
#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("Receiver not found ({vendor_id:04X}:{product_id:04X})")]
    NotFound { vendor_id: u16, product_id: u16 },

    #[error("Failed to open receiver: {0}")]
    OpenFailed(String),

    #[error("Read error: {0}")]
    ReadError(String),

    #[error("HID API error: {0}")]
    HidApiError(String),
}

/// Known receiver profile
#[derive(Debug, Clone)]
pub struct KnownReceiver {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// Receiver name
    pub name: &'static str,
}

/// Known receivers for automatic detection
pub const KNOWN_RECEIVERS: &[KnownReceiver] = &[KnownReceiver {
    vendor_id: DEFAULT_VENDOR_ID,
    product_id: DEFAULT_PRODUCT_ID,
    name: "SlimeVR CH592 Receiver",
}];

/// Product string fragments that identify a receiver flashed with a different VID/PID
pub const RECEIVER_NAME_HINTS: &[&str] = &["slime", "ch592"];

/// Find known receiver by VID/PID
pub fn find_known_receiver(vendor_id: u16, product_id: u16) -> Option<&'static KnownReceiver> {
    KNOWN_RECEIVERS
        .iter()
        .find(|r| r.vendor_id == vendor_id && r.product_id == product_id)
}

/// Check whether a product string looks like a tracker receiver.
pub fn looks_like_receiver(product: &str) -> bool {
    let product = product.to_lowercase();
    RECEIVER_NAME_HINTS.iter().any(|hint| product.contains(hint))
}
