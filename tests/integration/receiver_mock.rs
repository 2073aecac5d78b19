//! Mock receiver, tracker frames and sinks shared by the test suites.

#![allow(dead_code)]

use slimebridge::bridge::StopSignal;
use slimebridge::receiver::{DeviceOpener, ReceiverDevice, ReceiverError, ReceiverInfo};
use slimebridge::slimevr::{DatagramSink, PacketHeader, PacketType, SlimeError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock tracker frame generator.
pub struct MockTrackerFrame {
    pub tracker_id: u8,
    /// Q15 quaternion w, x, y, z
    pub quaternion: [i16; 4],
    /// Acceleration in mg (12-bit signed)
    pub accel_mg: i16,
    /// Battery code (0-15)
    pub battery_code: u8,
}

impl Default for MockTrackerFrame {
    fn default() -> Self {
        Self {
            tracker_id: 0,
            quaternion: [i16::MAX, 0, 0, 0],
            accel_mg: 0,
            battery_code: 15,
        }
    }
}

impl MockTrackerFrame {
    /// Generate an orientation frame.
    pub fn orientation(&self) -> Vec<u8> {
        let mut frame = vec![self.tracker_id & 0x3F];
        for component in self.quaternion {
            frame.extend_from_slice(&component.to_le_bytes());
        }
        let aux = ((self.accel_mg as u16) & 0x0FFF) | ((self.battery_code as u16 & 0x0F) << 12);
        frame.extend_from_slice(&aux.to_le_bytes());
        frame.push(0x00); // CRC8, unchecked
        frame
    }

    /// Generate a device info frame.
    pub fn device_info(&self) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame[0] = 0x40 | (self.tracker_id & 0x3F);
        frame
    }

    /// Generate a status frame.
    pub fn status(&self) -> Vec<u8> {
        let mut frame = vec![0u8; 12];
        frame[0] = 0x80 | (self.tracker_id & 0x3F);
        frame
    }
}

/// One scripted read result.
#[derive(Debug, Clone)]
pub enum MockRead {
    Frame(Vec<u8>),
    Empty,
    Error,
}

/// Scripted receiver that raises the stop signal once the script runs out.
pub struct MockReceiver {
    script: VecDeque<MockRead>,
    stop: StopSignal,
    closes: Arc<AtomicUsize>,
    nonblocking: bool,
    reject_nonblocking: bool,
}

impl ReceiverDevice for MockReceiver {
    fn set_nonblocking(&mut self) -> Result<(), ReceiverError> {
        if self.reject_nonblocking {
            return Err(ReceiverError::HidApiError(
                "non-blocking mode not supported".to_string(),
            ));
        }
        self.nonblocking = true;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, ReceiverError> {
        match self.script.pop_front() {
            Some(MockRead::Frame(frame)) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(len)
            }
            Some(MockRead::Empty) => Ok(0),
            Some(MockRead::Error) => Err(ReceiverError::ReadError("device busy".to_string())),
            None => {
                self.stop.trigger();
                Ok(0)
            }
        }
    }

    fn info(&self) -> Option<ReceiverInfo> {
        Some(ReceiverInfo {
            vendor_id: 0x1209,
            product_id: 0x5634,
            product: Some("Mock Receiver".to_string()),
            manufacturer: Some("Test".to_string()),
            ..Default::default()
        })
    }

    fn close(self) -> Result<(), ReceiverError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opener handing out one scripted receiver.
pub struct MockOpener {
    script: Mutex<Option<Vec<MockRead>>>,
    stop: StopSignal,
    pub closes: Arc<AtomicUsize>,
    pub fail: bool,
    pub reject_nonblocking: bool,
}

impl MockOpener {
    pub fn new(script: Vec<MockRead>, stop: StopSignal) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            stop,
            closes: Arc::new(AtomicUsize::new(0)),
            fail: false,
            reject_nonblocking: false,
        }
    }

    /// Opener whose receiver refuses non-blocking mode.
    pub fn blocking_only(script: Vec<MockRead>, stop: StopSignal) -> Self {
        Self {
            reject_nonblocking: true,
            ..Self::new(script, stop)
        }
    }

    pub fn failing() -> Self {
        Self {
            script: Mutex::new(None),
            stop: StopSignal::new(),
            closes: Arc::new(AtomicUsize::new(0)),
            fail: true,
            reject_nonblocking: false,
        }
    }
}

impl DeviceOpener for MockOpener {
    type Device = MockReceiver;

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<MockReceiver, ReceiverError> {
        if self.fail {
            return Err(ReceiverError::OpenFailed(format!(
                "no device {:04X}:{:04X}",
                vendor_id, product_id
            )));
        }

        let script = self.script.lock().unwrap().take().unwrap_or_default();
        Ok(MockReceiver {
            script: script.into(),
            stop: self.stop.clone(),
            closes: Arc::clone(&self.closes),
            nonblocking: false,
            reject_nonblocking: self.reject_nonblocking,
        })
    }
}

/// Sink recording every packet in send order.
#[derive(Clone, Default)]
pub struct RecordingSink {
    packets: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.packets.lock().unwrap().clone()
    }

    /// Headers of every recorded packet.
    pub fn headers(&self) -> Vec<PacketHeader> {
        self.packets()
            .iter()
            .map(|p| PacketHeader::parse(p).unwrap())
            .collect()
    }

    /// Packet types in send order.
    pub fn types(&self) -> Vec<PacketType> {
        self.headers()
            .iter()
            .map(|h| h.packet_type().unwrap())
            .collect()
    }

    /// Packet types in send order, without heartbeats.
    pub fn types_without_heartbeats(&self) -> Vec<PacketType> {
        self.types()
            .into_iter()
            .filter(|t| *t != PacketType::Heartbeat)
            .collect()
    }
}

impl DatagramSink for RecordingSink {
    fn send(&self, bytes: &[u8]) -> Result<(), SlimeError> {
        self.packets.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

/// Sink that fails every send.
pub struct FailingSink;

impl DatagramSink for FailingSink {
    fn send(&self, _bytes: &[u8]) -> Result<(), SlimeError> {
        Err(SlimeError::Send("network unreachable".to_string()))
    }
}

/// Read the f32 at `offset` of a packet.
pub fn read_f32(packet: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes(packet[offset..offset + 4].try_into().unwrap())
}

/// Read the u32 at `offset` of a packet.
pub fn read_u32(packet: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(packet[offset..offset + 4].try_into().unwrap())
}
