//! Receiver frame decoding.
//!
//! Every report from the receiver starts with a 12-byte tracker frame:
//!
//! ```text
//! [0]     header: kind (bits 7:6) | tracker id (bits 5:0)
//! [1-8]   quaternion w, x, y, z as little-endian Q15 i16
//! [9-10]  aux: accel z (bits 11:0, signed mg) | battery code (bits 15:12)
//! [11]    CRC8 (not validated)
//! ```

/// Minimum number of bytes needed to decode a frame.
pub const MIN_FRAME_LEN: usize = 12;

/// Q15 fixed-point scale for quaternion components.
pub const Q15_SCALE: f32 = 32768.0;

/// Highest tracker identity that fits in the header.
pub const MAX_TRACKER_ID: u8 = 0x3F;

const KIND_SHIFT: u8 = 6;
const ACCEL_MASK: u16 = 0x0FFF;
const ACCEL_SIGN_LIMIT: i16 = 2047;
const BATTERY_CODE_MAX: u16 = 15;

/// Frame kind selected by the top two header bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Quaternion, acceleration and battery data
    Orientation,
    /// Tracker device information
    DeviceInfo,
    /// Tracker status
    Status,
}

impl FrameKind {
    /// Map the 2-bit selector to a kind. Selector 3 is reserved.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(FrameKind::Orientation),
            1 => Some(FrameKind::DeviceInfo),
            2 => Some(FrameKind::Status),
            _ => None,
        }
    }

    /// Get the 2-bit selector for this kind.
    pub fn selector(&self) -> u8 {
        match self {
            FrameKind::Orientation => 0,
            FrameKind::DeviceInfo => 1,
            FrameKind::Status => 2,
        }
    }
}

/// Payload of an orientation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationData {
    /// Rotation quaternion in w, x, y, z order, each in [-1.0, 0.99997]
    pub quaternion: [f32; 4],
    /// Vertical acceleration in g
    pub accel_z: f32,
    /// Battery level in percent (0-100)
    pub battery_pct: u8,
}

/// Decoded tracker reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Orientation { tracker_id: u8, data: OrientationData },
    DeviceInfo { tracker_id: u8 },
    Status { tracker_id: u8 },
}

impl SensorReading {
    /// Tracker identity (0-63).
    pub fn tracker_id(&self) -> u8 {
        match self {
            SensorReading::Orientation { tracker_id, .. }
            | SensorReading::DeviceInfo { tracker_id }
            | SensorReading::Status { tracker_id } => *tracker_id,
        }
    }

    /// Frame kind this reading was decoded from.
    pub fn kind(&self) -> FrameKind {
        match self {
            SensorReading::Orientation { .. } => FrameKind::Orientation,
            SensorReading::DeviceInfo { .. } => FrameKind::DeviceInfo,
            SensorReading::Status { .. } => FrameKind::Status,
        }
    }

    /// Rebuild the header byte this reading was decoded from.
    pub fn header_byte(&self) -> u8 {
        (self.kind().selector() << KIND_SHIFT) | (self.tracker_id() & MAX_TRACKER_ID)
    }
}

/// Decode a receiver frame.
///
/// Returns `None` for frames shorter than [`MIN_FRAME_LEN`] and for the
/// reserved kind selector. Bytes past the first twelve are ignored.
pub fn decode_frame(frame: &[u8]) -> Option<SensorReading> {
    if frame.len() < MIN_FRAME_LEN {
        return None;
    }

    let header = frame[0];
    let tracker_id = header & MAX_TRACKER_ID;

    match FrameKind::from_selector(header >> KIND_SHIFT)? {
        FrameKind::Orientation => Some(SensorReading::Orientation {
            tracker_id,
            data: decode_orientation(frame),
        }),
        FrameKind::DeviceInfo => Some(SensorReading::DeviceInfo { tracker_id }),
        FrameKind::Status => Some(SensorReading::Status { tracker_id }),
    }
}

fn decode_orientation(frame: &[u8]) -> OrientationData {
    let mut quaternion = [0.0f32; 4];
    for (i, component) in quaternion.iter_mut().enumerate() {
        let offset = 1 + i * 2;
        let raw = i16::from_le_bytes([frame[offset], frame[offset + 1]]);
        *component = raw as f32 / Q15_SCALE;
    }

    let aux = u16::from_le_bytes([frame[9], frame[10]]);

    OrientationData {
        quaternion,
        accel_z: accel_from_raw(aux & ACCEL_MASK),
        battery_pct: battery_pct_from_code((aux >> 12) as u8),
    }
}

/// Convert the 12-bit two's complement accelerometer field (mg) to g.
pub fn accel_from_raw(raw: u16) -> f32 {
    let mut value = (raw & ACCEL_MASK) as i16;
    if value > ACCEL_SIGN_LIMIT {
        value -= 4096;
    }
    value as f32 / 1000.0
}

/// Convert the 4-bit battery code to a percentage (integer division).
pub fn battery_pct_from_code(code: u8) -> u8 {
    let code = (code as u16) & BATTERY_CODE_MAX;
    (code * 100 / BATTERY_CODE_MAX) as u8
}
