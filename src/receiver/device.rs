//! Receiver Device Access
//!
//! Capability traits for opening and reading the receiver, and their
//! hidapi-backed implementation.

use super::{find_known_receiver, looks_like_receiver, ReceiverError};
use hidapi::{HidApi, HidDevice};
use std::time::Duration;

/// Description of an attached HID device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverInfo {
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// Product string if available
    pub product: Option<String>,
    /// Manufacturer string if available
    pub manufacturer: Option<String>,
    /// Serial number if available
    pub serial_number: Option<String>,
    /// Platform device path
    pub path: String,
}

impl ReceiverInfo {
    /// Get device path for display
    pub fn display_path(&self) -> String {
        format!("{:04X}:{:04X}", self.vendor_id, self.product_id)
    }

    /// Check if this device is a known receiver or names itself like one
    pub fn is_receiver_candidate(&self) -> bool {
        find_known_receiver(self.vendor_id, self.product_id).is_some()
            || self.product.as_deref().is_some_and(looks_like_receiver)
    }
}

/// An open receiver handle.
///
/// Closing consumes the handle, so a device can only be closed once.
pub trait ReceiverDevice: Send {
    /// Switch the handle to non-blocking mode.
    fn set_nonblocking(&mut self) -> Result<(), ReceiverError>;

    /// Read one report, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when no report arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, ReceiverError>;

    /// Describe the opened device, if the platform reports it.
    fn info(&self) -> Option<ReceiverInfo> {
        None
    }

    /// Close the handle.
    fn close(self) -> Result<(), ReceiverError>;
}

/// Opens receiver handles by VID/PID.
pub trait DeviceOpener {
    type Device: ReceiverDevice;

    /// Open the first device matching `vendor_id`/`product_id`.
    fn open(&self, vendor_id: u16, product_id: u16) -> Result<Self::Device, ReceiverError>;
}

/// hidapi-backed opener
pub struct HidReceiverOpener {
    api: HidApi,
}

impl HidReceiverOpener {
    /// Initialize the HID API.
    pub fn new() -> Result<Self, ReceiverError> {
        let api = HidApi::new().map_err(|e| ReceiverError::HidApiError(e.to_string()))?;
        Ok(Self { api })
    }

    /// List all attached HID devices.
    pub fn list_devices(&mut self) -> Result<Vec<ReceiverInfo>, ReceiverError> {
        self.api
            .refresh_devices()
            .map_err(|e| ReceiverError::HidApiError(e.to_string()))?;

        let devices = self
            .api
            .device_list()
            .map(|d| ReceiverInfo {
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                product: d.product_string().map(str::to_string),
                manufacturer: d.manufacturer_string().map(str::to_string),
                serial_number: d.serial_number().map(str::to_string),
                path: d.path().to_string_lossy().into_owned(),
            })
            .collect();

        Ok(devices)
    }

    /// Look for the receiver before connecting.
    ///
    /// Prefers an exact VID/PID match and falls back to any device whose
    /// product string looks like a receiver.
    pub fn find_receiver(
        &mut self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<ReceiverInfo, ReceiverError> {
        tracing::info!("Searching for tracker receiver...");

        let devices = self.list_devices()?;

        if let Some(device) = devices
            .iter()
            .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
        {
            tracing::info!(
                "Found receiver: {}",
                device.product.as_deref().unwrap_or("unknown product")
            );
            tracing::debug!("  Path: {}", device.path);
            tracing::debug!("  VID/PID: {}", device.display_path());
            return Ok(device.clone());
        }

        tracing::info!("Searching other HID devices...");

        devices
            .into_iter()
            .find(|d| d.is_receiver_candidate())
            .inspect(|d| {
                tracing::info!(
                    "Found possible receiver: {} ({})",
                    d.product.as_deref().unwrap_or("unknown product"),
                    d.display_path()
                );
            })
            .ok_or(ReceiverError::NotFound {
                vendor_id,
                product_id,
            })
    }
}

impl DeviceOpener for HidReceiverOpener {
    type Device = HidReceiver;

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<HidReceiver, ReceiverError> {
        let device = self
            .api
            .open(vendor_id, product_id)
            .map_err(|e| ReceiverError::OpenFailed(e.to_string()))?;

        Ok(HidReceiver {
            device,
            vendor_id,
            product_id,
        })
    }
}

/// Open receiver handle backed by hidapi
pub struct HidReceiver {
    device: HidDevice,
    vendor_id: u16,
    product_id: u16,
}

impl ReceiverDevice for HidReceiver {
    fn set_nonblocking(&mut self) -> Result<(), ReceiverError> {
        self.device
            .set_blocking_mode(false)
            .map_err(|e| ReceiverError::HidApiError(e.to_string()))
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, ReceiverError> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| ReceiverError::ReadError(e.to_string()))
    }

    fn info(&self) -> Option<ReceiverInfo> {
        Some(ReceiverInfo {
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            product: self.device.get_product_string().ok().flatten(),
            manufacturer: self.device.get_manufacturer_string().ok().flatten(),
            serial_number: self.device.get_serial_number_string().ok().flatten(),
            path: String::new(),
        })
    }

    fn close(self) -> Result<(), ReceiverError> {
        tracing::debug!("Closing receiver {:04X}:{:04X}", self.vendor_id, self.product_id);
        drop(self.device);
        Ok(())
    }
}
